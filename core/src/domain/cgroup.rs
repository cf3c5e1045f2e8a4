//! Parsing of `/proc/<pid>/cgroup` membership records.
//!
//! Each line has the form `hierarchy-id:controller-list:cgroup-path`.
//! Container runtimes and systemd both name their scopes in that path.

use std::sync::LazyLock;

use regex::Regex;

use super::Runtime;

/// Container scope patterns, in priority order, with the runtime they hint at.
static CONTAINER_PATTERNS: LazyLock<Vec<(Regex, Runtime)>> = LazyLock::new(|| {
    [
        (r"libpod-([0-9a-f]{64})", Runtime::Podman),
        (r"docker-([0-9a-f]{64})", Runtime::Docker),
        (r"/docker/([0-9a-f]{64})", Runtime::Docker),
        // LXC-based docker
        (r"/lxc/([0-9a-f]{64})", Runtime::Docker),
    ]
    .into_iter()
    .map(|(pattern, runtime)| (Regex::new(pattern).expect("valid container pattern"), runtime))
    .collect()
});

/// Units that manage sessions or container infrastructure and must never
/// be offered as a kill target.
const INFRASTRUCTURE_UNITS: &[&str] = &[
    "docker.service",
    "podman.service",
    "containerd.service",
    "gdm.service",
    "sddm.service",
    "lightdm.service",
    "display-manager.service",
];

/// Extract the first container id in `content` with its runtime hint.
pub fn parse_container_id(content: &str) -> Option<(String, Runtime)> {
    content.lines().find_map(|line| {
        CONTAINER_PATTERNS.iter().find_map(|(re, runtime)| {
            re.captures(line)
                .map(|caps| (caps[1].to_string(), *runtime))
        })
    })
}

/// The first `.service` segment across all cgroup paths, if it is not an
/// infrastructure unit.
///
/// Scanning stops at the first candidate: an excluded unit yields `None`
/// rather than an unrelated ancestor unit.
pub fn parse_systemd_unit(content: &str) -> Option<String> {
    let candidate = content.lines().find_map(|line| {
        let mut parts = line.splitn(3, ':');
        let (_, _, path) = (parts.next()?, parts.next()?, parts.next()?);
        path.split('/').find(|seg| seg.ends_with(".service"))
    })?;

    if is_infrastructure_unit(candidate) {
        None
    } else {
        Some(candidate.to_string())
    }
}

/// Whether `unit` is a session or container-infrastructure unit.
pub fn is_infrastructure_unit(unit: &str) -> bool {
    unit.starts_with("user@") || INFRASTRUCTURE_UNITS.contains(&unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ID: &str = "4f2a1c9e8b7d6a5f4e3d2c1b0a9f8e7d6c5b4a3f2e1d0c9b8a7f6e5d4c3b2a1f";

    #[test]
    fn test_parse_container_id() {
        let cases = [
            (format!("0::/system.slice/libpod-{}.scope", TEST_ID), Runtime::Podman),
            (format!("0::/system.slice/docker-{}.scope", TEST_ID), Runtime::Docker),
            (format!("12:memory:/docker/{}", TEST_ID), Runtime::Docker),
            (format!("12:memory:/lxc/{}", TEST_ID), Runtime::Docker),
            (
                format!("12:pids:/user.slice/user-1000.slice\n0::/system.slice/libpod-{}.scope", TEST_ID),
                Runtime::Podman,
            ),
        ];
        for (content, runtime) in cases {
            let (id, hint) = parse_container_id(&content).unwrap();
            assert_eq!(id, TEST_ID);
            assert_eq!(hint, runtime, "content: {}", content);
        }
    }

    #[test]
    fn test_parse_container_id_none() {
        assert!(parse_container_id("0::/user.slice/user-1000.slice/session-1.scope").is_none());
        assert!(parse_container_id("").is_none());
        // Too short to be a runtime id
        assert!(parse_container_id("0::/system.slice/docker-abc123.scope").is_none());
    }

    #[test]
    fn test_parse_systemd_unit() {
        assert_eq!(
            parse_systemd_unit("0::/system.slice/nginx.service").as_deref(),
            Some("nginx.service")
        );
        assert_eq!(
            parse_systemd_unit("1:name=systemd:/system.slice/postgresql.service\n0::/").as_deref(),
            Some("postgresql.service")
        );
        assert_eq!(
            parse_systemd_unit("0::/user.slice/user-1000.slice/session-2.scope"),
            None
        );
        assert_eq!(parse_systemd_unit(""), None);
        assert_eq!(parse_systemd_unit("garbage"), None);
    }

    #[test]
    fn test_infrastructure_units_never_returned() {
        for unit in [
            "user@1000.service",
            "docker.service",
            "podman.service",
            "containerd.service",
            "gdm.service",
            "sddm.service",
            "lightdm.service",
            "display-manager.service",
        ] {
            assert!(is_infrastructure_unit(unit));
            let content = format!("0::/system.slice/{}", unit);
            assert_eq!(parse_systemd_unit(&content), None, "{} leaked", unit);
        }
        assert!(!is_infrastructure_unit("nginx.service"));
    }

    #[test]
    fn test_excluded_first_candidate_stops_scan() {
        let content =
            "0::/user.slice/user-1000.slice/user@1000.service/app.slice/myapp.service";
        assert_eq!(parse_systemd_unit(content), None);
    }
}
