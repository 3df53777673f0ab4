use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

/// Default replica set, kept in step with [`crate::protocol::DEFAULT_APPS`].
pub const DEFAULT_APPS_ARG: &str = "case-management,customer-portal,back-office";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn validator_url() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<String, String> {
        url::Url::parse(value)
            .map(|_| value.to_string())
            .map_err(|err| format!("invalid URL: {err}"))
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("handover")
        .about("Cross-domain authentication handover")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("HANDOVER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("public-url")
                .long("public-url")
                .help("Base URL this service is reachable at from the browser, example: https://apps.tld/auth/")
                .env("HANDOVER_PUBLIC_URL")
                .value_parser(validator_url())
                .required(true),
        )
        .arg(
            Arg::new("cookie-handover-url")
                .long("cookie-handover-url")
                .help("Endpoint that reads the session cookies and appends them as `cc`")
                .env("HANDOVER_COOKIE_URL")
                .value_parser(validator_url())
                .required(true),
        )
        .arg(
            Arg::new("token-handover-url")
                .long("token-handover-url")
                .help("Endpoint that exchanges `cc` for a bearer token")
                .env("HANDOVER_TOKEN_URL")
                .value_parser(validator_url())
                .required(true),
        )
        .arg(
            Arg::new("apps")
                .long("apps")
                .help("Applications holding a replica of the auth record")
                .env("HANDOVER_APPS")
                .value_delimiter(',')
                .default_value(DEFAULT_APPS_ARG),
        )
        .arg(
            Arg::new("storage")
                .long("storage")
                .help("JSON file to keep auth replicas in (default: in memory)")
                .env("HANDOVER_STORAGE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .help("Emit logs as JSON")
                .env("HANDOVER_LOG_JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("HANDOVER_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("outbound")
                .about("Print the URL that starts a handover towards a target")
                .arg(
                    Arg::new("target")
                        .short('t')
                        .long("target")
                        .help("URL the user should land on once authenticated")
                        .required(true),
                )
                .arg(
                    Arg::new("direct")
                        .long("direct")
                        .help("Skip the outbound hop and start at the cookie handover")
                        .action(ArgAction::SetTrue),
                ),
        )
}
