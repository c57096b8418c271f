use clap::{Arg, ArgMatches, Command};

pub const ARG_MAIL_URL: &str = "mail-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_MAIL_URL)
            .long(ARG_MAIL_URL)
            .help("Mail relay endpoint; reset emails are logged instead when unset")
            .env("CUSTOS_MAIL_URL"),
    )
}

#[derive(Debug)]
pub struct Options {
    pub url: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let url = matches
            .get_one::<String>(ARG_MAIL_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty());

        Self { url }
    }
}
