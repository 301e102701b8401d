// SPDX-License-Identifier: GPL-3.0-only

//! Building `rclone mount` command lines from mount definitions

use std::path::{Path, PathBuf};

use netmount_types::{AuthMode, MountDefinition, MountType};

/// Prefix of the named sections generated for SMB mounts
pub const SMB_SECTION_PREFIX: &str = "smb_";

/// Credentials rclone documents for anonymous FTP
const ANONYMOUS_FTP_USER: &str = "anonymous";
const ANONYMOUS_FTP_PASS: &str = "rclone@rclone.org";

/// Ownership and permission bits applied to every mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountDefaults {
    pub uid: u32,
    pub gid: u32,
    pub umask: String,
}

impl Default for MountDefaults {
    fn default() -> Self {
        Self {
            uid: 0,
            gid: 9997,
            umask: "0007".to_string(),
        }
    }
}

/// Fully resolved command line for one mount attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountInvocation {
    /// Remote argument handed to rclone (`section:path` or a URL)
    pub remote: String,
    pub mount_point: PathBuf,
    /// Arguments after the program name, starting with `mount`
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Whether the remote refers to a section of the rclone config file
    pub uses_config_file: bool,
}

/// Where the generated artifacts live
#[derive(Debug, Clone, Copy)]
pub struct InvocationContext<'a> {
    pub config_path: &'a Path,
    pub home_dir: &'a Path,
    pub defaults: &'a MountDefaults,
}

/// SMB remote split into host and optional share path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbRemote {
    pub host: String,
    pub share: Option<String>,
}

/// Split `host/share/sub` at the first slash
pub fn split_smb_remote(remote: &str) -> SmbRemote {
    match remote.split_once('/') {
        Some((host, share)) if !share.is_empty() => SmbRemote {
            host: host.to_string(),
            share: Some(share.to_string()),
        },
        Some((host, _)) => SmbRemote {
            host: host.to_string(),
            share: None,
        },
        None => SmbRemote {
            host: remote.to_string(),
            share: None,
        },
    }
}

pub fn smb_section_name(mount_name: &str) -> String {
    format!("{SMB_SECTION_PREFIX}{mount_name}")
}

/// Key/value lines of the named SMB section
pub fn smb_section_entries(
    definition: &MountDefinition,
    host: &str,
    password: &str,
) -> Vec<(String, String)> {
    vec![
        ("type".to_string(), "smb".to_string()),
        ("host".to_string(), host.to_string()),
        ("user".to_string(), definition.user.clone()),
        ("pass".to_string(), password.to_string()),
    ]
}

pub fn normalize_ftp_remote(remote: &str) -> String {
    if remote.starts_with("ftp://") {
        remote.to_string()
    } else {
        format!("ftp://{remote}")
    }
}

pub fn normalize_webdav_remote(remote: &str) -> String {
    if remote.starts_with("http://") || remote.starts_with("https://") {
        remote.to_string()
    } else {
        format!("http://{remote}")
    }
}

/// Resolve the remote argument and whether it needs `--config`
fn resolve_remote(definition: &MountDefinition) -> (String, bool) {
    match &definition.mount_type {
        MountType::Smb => {
            let section = smb_section_name(&definition.name);
            let remote = match split_smb_remote(&definition.remote_address).share {
                Some(share) => format!("{section}:{share}"),
                None => format!("{section}:"),
            };
            (remote, true)
        }
        MountType::Ftp => (normalize_ftp_remote(&definition.remote_address), false),
        MountType::Webdav => (normalize_webdav_remote(&definition.remote_address), false),
        MountType::Other(_) => (definition.remote_address.clone(), true),
    }
}

fn auth_flags(definition: &MountDefinition) -> Vec<String> {
    let (user_flag, pass_flag, user, pass) = match (&definition.mount_type, definition.auth_mode) {
        (MountType::Webdav, AuthMode::Password) => (
            "--webdav-user",
            "--webdav-pass",
            definition.user.as_str(),
            definition.secret.as_str(),
        ),
        (MountType::Ftp, AuthMode::Password) => (
            "--ftp-user",
            "--ftp-pass",
            definition.user.as_str(),
            definition.secret.as_str(),
        ),
        (MountType::Ftp, AuthMode::Anonymous) => (
            "--ftp-user",
            "--ftp-pass",
            ANONYMOUS_FTP_USER,
            ANONYMOUS_FTP_PASS,
        ),
        // SMB credentials live in the named section
        _ => return Vec::new(),
    };

    vec![
        user_flag.to_string(),
        user.to_string(),
        pass_flag.to_string(),
        pass.to_string(),
    ]
}

fn parameter_flags(definition: &MountDefinition) -> Vec<String> {
    let mut args = Vec::new();
    for (key, value) in &definition.protocol_parameters {
        let key = key.trim().trim_start_matches("--");
        if key.is_empty() {
            continue;
        }
        args.push(format!("--{key}"));
        if !value.is_empty() {
            args.push(value.clone());
        }
    }
    args
}

/// Build the full `rclone mount` command line for `definition`
pub fn build_invocation(definition: &MountDefinition, ctx: &InvocationContext<'_>) -> MountInvocation {
    let (remote, uses_config_file) = resolve_remote(definition);
    let mount_point = definition.local_path.clone();

    let mut args = vec![
        "mount".to_string(),
        remote.clone(),
        mount_point.to_string_lossy().into_owned(),
    ];

    if uses_config_file {
        args.push("--config".to_string());
        args.push(ctx.config_path.to_string_lossy().into_owned());
    }

    for flag in ["--allow-other", "--allow-non-empty"] {
        args.push(flag.to_string());
    }
    args.push("--log-level".to_string());
    args.push("INFO".to_string());
    args.push("--uid".to_string());
    args.push(ctx.defaults.uid.to_string());
    args.push("--gid".to_string());
    args.push(ctx.defaults.gid.to_string());
    args.push("--umask".to_string());
    args.push(ctx.defaults.umask.clone());
    args.push("--vfs-cache-mode".to_string());
    args.push("writes".to_string());

    if !uses_config_file {
        args.push("--no-check-certificate".to_string());
    }

    args.extend(auth_flags(definition));
    args.extend(parameter_flags(definition));

    MountInvocation {
        remote,
        mount_point,
        args,
        env: vec![(
            "HOME".to_string(),
            ctx.home_dir.to_string_lossy().into_owned(),
        )],
        uses_config_file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(defaults: &'a MountDefaults) -> InvocationContext<'a> {
        InvocationContext {
            config_path: Path::new("/data/adb/netmount/rclone.conf"),
            home_dir: Path::new("/data/adb/netmount"),
            defaults,
        }
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|index| args.get(index + 1))
            .map(String::as_str)
    }

    #[test]
    fn splits_smb_host_and_share() {
        assert_eq!(
            split_smb_remote("nas.local/media/movies"),
            SmbRemote {
                host: "nas.local".to_string(),
                share: Some("media/movies".to_string()),
            }
        );
        assert_eq!(split_smb_remote("nas.local").share, None);
        assert_eq!(split_smb_remote("nas.local/").share, None);
    }

    #[test]
    fn ftp_gets_scheme_and_direct_credentials() {
        let defaults = MountDefaults::default();
        let definition = MountDefinition::new("a", MountType::Ftp, "host/path", "/mnt/a")
            .with_password("bob", "hunter2");

        let invocation = build_invocation(&definition, &context(&defaults));

        assert_eq!(invocation.remote, "ftp://host/path");
        assert_eq!(&invocation.args[..3], ["mount", "ftp://host/path", "/mnt/a"]);
        assert!(!invocation.uses_config_file);
        assert!(!invocation.args.contains(&"--config".to_string()));
        assert!(invocation.args.contains(&"--no-check-certificate".to_string()));
        assert_eq!(flag_value(&invocation.args, "--ftp-user"), Some("bob"));
        assert_eq!(flag_value(&invocation.args, "--ftp-pass"), Some("hunter2"));
    }

    #[test]
    fn anonymous_ftp_uses_fallback_credentials() {
        let defaults = MountDefaults::default();
        let mut definition = MountDefinition::new("a", MountType::Ftp, "ftp://host", "/mnt/a");
        definition.auth_mode = AuthMode::Anonymous;

        let invocation = build_invocation(&definition, &context(&defaults));

        assert_eq!(invocation.remote, "ftp://host");
        assert_eq!(flag_value(&invocation.args, "--ftp-user"), Some("anonymous"));
        assert_eq!(
            flag_value(&invocation.args, "--ftp-pass"),
            Some("rclone@rclone.org")
        );
    }

    #[test]
    fn webdav_keeps_https_scheme() {
        let defaults = MountDefaults::default();
        let https = MountDefinition::new("w", MountType::Webdav, "https://dav.example", "/mnt/w");
        let bare = MountDefinition::new("w", MountType::Webdav, "dav.example", "/mnt/w");

        assert_eq!(
            build_invocation(&https, &context(&defaults)).remote,
            "https://dav.example"
        );
        let invocation = build_invocation(&bare, &context(&defaults));
        assert_eq!(invocation.remote, "http://dav.example");
        assert_eq!(flag_value(&invocation.args, "--webdav-user"), None);
    }

    #[test]
    fn smb_points_at_named_section() {
        let defaults = MountDefaults::default();
        let definition = MountDefinition::new("nas", MountType::Smb, "10.0.0.2/share", "/mnt/nas")
            .with_password("alice", "pw");

        let invocation = build_invocation(&definition, &context(&defaults));

        assert_eq!(invocation.remote, "smb_nas:share");
        assert!(invocation.uses_config_file);
        assert_eq!(
            flag_value(&invocation.args, "--config"),
            Some("/data/adb/netmount/rclone.conf")
        );
        assert!(!invocation.args.iter().any(|arg| arg.contains("pw")));
        assert!(!invocation.args.contains(&"--no-check-certificate".to_string()));
    }

    #[test]
    fn applies_ownership_defaults_and_home() {
        let defaults = MountDefaults {
            uid: 1000,
            gid: 1000,
            umask: "0022".to_string(),
        };
        let definition = MountDefinition::new("s3", MountType::Other("s3".into()), "s3:bucket", "/mnt/s3");

        let invocation = build_invocation(&definition, &context(&defaults));

        assert_eq!(invocation.remote, "s3:bucket");
        assert_eq!(flag_value(&invocation.args, "--uid"), Some("1000"));
        assert_eq!(flag_value(&invocation.args, "--gid"), Some("1000"));
        assert_eq!(flag_value(&invocation.args, "--umask"), Some("0022"));
        assert_eq!(flag_value(&invocation.args, "--vfs-cache-mode"), Some("writes"));
        assert_eq!(
            invocation.env,
            vec![("HOME".to_string(), "/data/adb/netmount".to_string())]
        );
    }

    #[test]
    fn protocol_parameters_become_trailing_flags() {
        let defaults = MountDefaults::default();
        let mut definition = MountDefinition::new("a", MountType::Ftp, "host", "/mnt/a");
        definition
            .protocol_parameters
            .insert("--buffer-size".to_string(), "32M".to_string());
        definition
            .protocol_parameters
            .insert("read-only".to_string(), String::new());

        let invocation = build_invocation(&definition, &context(&defaults));
        let tail = &invocation.args[invocation.args.len() - 3..];

        assert_eq!(tail, ["--buffer-size", "32M", "--read-only"]);
    }
}
