pub mod logging;
pub mod password;
pub mod sso;
pub mod tls;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_STATIC_DIR: &str = "static-dir";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("gatehouse")
        .about("Google single sign-on and password login services")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("3000")
                .env("GATEHOUSE_PORT")
                .global(true)
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_STATIC_DIR)
                .long(ARG_STATIC_DIR)
                .help("Directory holding index.html and other static assets")
                .default_value("static")
                .env("GATEHOUSE_STATIC_DIR")
                .global(true),
        )
        .subcommand(sso::command())
        .subcommand(password::command());

    let command = tls::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSO_ENV: [(&str, Option<&str>); 3] = [
        ("SESSION_SECRET", Some("session-secret")),
        ("GOOGLE_CLIENT_ID", Some("client-id")),
        ("GOOGLE_CLIENT_SECRET", Some("client-secret")),
    ];

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "gatehouse");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Google single sign-on and password login services".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert!(command.find_subcommand(sso::COMMAND).is_some());
        assert!(command.find_subcommand(password::COMMAND).is_some());
    }

    #[test]
    fn test_password_defaults() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_PORT", None::<&str>),
                ("GATEHOUSE_STATIC_DIR", None),
                ("GATEHOUSE_TLS_CERT_PATH", None),
                ("GATEHOUSE_TLS_KEY_PATH", None),
                ("GATEHOUSE_LOGIN_EMAIL", None),
                ("GATEHOUSE_LOGIN_PASSWORD_HASH", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["gatehouse", "password"]);
                let Some(("password", sub)) = matches.subcommand() else {
                    panic!("expected password subcommand");
                };
                assert_eq!(sub.get_one::<u16>(ARG_PORT).copied(), Some(3000));
                assert_eq!(
                    sub.get_one::<String>(ARG_STATIC_DIR).cloned(),
                    Some("static".to_string())
                );
                assert_eq!(
                    sub.get_one::<String>(tls::ARG_TLS_CERT_PATH).cloned(),
                    Some("cert.pem".to_string())
                );
                assert_eq!(
                    sub.get_one::<String>(password::ARG_LOGIN_EMAIL).cloned(),
                    Some("user@example.com".to_string())
                );
            },
        );
    }

    #[test]
    fn test_global_args_after_subcommand() {
        temp_env::with_vars(SSO_ENV, || {
            let matches = new().get_matches_from(vec![
                "gatehouse",
                "sso",
                "--port",
                "8443",
                "--tls-cert-path",
                "/tmp/gatehouse-cert.pem",
            ]);
            let Some(("sso", sub)) = matches.subcommand() else {
                panic!("expected sso subcommand");
            };
            assert_eq!(sub.get_one::<u16>(ARG_PORT).copied(), Some(8443));
            assert_eq!(
                sub.get_one::<String>(tls::ARG_TLS_CERT_PATH).cloned(),
                Some("/tmp/gatehouse-cert.pem".to_string())
            );
        });
    }

    #[test]
    fn test_sso_requires_google_credentials() {
        temp_env::with_vars(
            [
                ("SESSION_SECRET", Some("session-secret")),
                ("GOOGLE_CLIENT_ID", None::<&str>),
                ("GOOGLE_CLIENT_SECRET", None),
            ],
            || {
                let result = new().try_get_matches_from(vec!["gatehouse", "sso"]);
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn test_sso_env() {
        temp_env::with_vars(
            [
                ("SESSION_SECRET", Some("session-secret")),
                ("GOOGLE_CLIENT_ID", Some("client-id")),
                ("GOOGLE_CLIENT_SECRET", Some("client-secret")),
                ("GATEHOUSE_PORT", Some("443")),
                ("GATEHOUSE_PUBLIC_URL", Some("https://login.example.com")),
                ("GATEHOUSE_SESSION_TTL_SECONDS", Some("600")),
                ("GATEHOUSE_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["gatehouse", "sso"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
                let Some(("sso", sub)) = matches.subcommand() else {
                    panic!("expected sso subcommand");
                };
                assert_eq!(sub.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    sub.get_one::<String>(sso::ARG_PUBLIC_URL).cloned(),
                    Some("https://login.example.com".to_string())
                );
                assert_eq!(
                    sub.get_one::<u64>(sso::ARG_SESSION_TTL_SECONDS).copied(),
                    Some(600)
                );
            },
        );
    }

    #[test]
    fn test_password_hash_is_validated() {
        temp_env::with_vars(
            [("GATEHOUSE_LOGIN_PASSWORD_HASH", Some("plaintext"))],
            || {
                let result = new().try_get_matches_from(vec!["gatehouse", "password"]);
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("GATEHOUSE_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["gatehouse", "password"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            let mut args = vec!["gatehouse".to_string(), "password".to_string()];

            // Add the appropriate number of "-v" flags based on the index
            if index > 0 {
                args.push(format!("-{}", "v".repeat(index)));
            }

            temp_env::with_vars([("GATEHOUSE_LOG_LEVEL", None::<&str>)], || {
                let matches = new().get_matches_from(args.clone());
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
