use std::io::Error;

#[derive(Debug, Clone)]
pub struct CmdArgs {
    pub config: Option<String>,
    pub once: bool,
    pub dry_run: bool,
}

impl CmdArgs {
    pub fn parse(args: Vec<String>) -> Result<Self, Error> {
        let mut config = String::new();
        let mut once = false;
        let mut dry_run = false;
        {
            let mut ap = argparse::ArgumentParser::new();
            ap.set_description("Relay Futu flash news to a Telegram chat");
            ap.refer(&mut config).add_option(
                &["-c", "--config"],
                argparse::Store,
                "Optional JSON config file; environment variables take precedence",
            );
            ap.refer(&mut once).add_option(
                &["-o", "--once"],
                argparse::StoreTrue,
                "Poll the feed a single time and exit",
            );
            ap.refer(&mut dry_run).add_option(
                &["-d", "--dry-run"],
                argparse::StoreTrue,
                "Log messages instead of sending them to Telegram",
            );

            match ap.parse(args, &mut std::io::stdout(), &mut std::io::stderr()) {
                Ok(()) => {}
                Err(_) => {
                    return Err(Error::from(std::io::ErrorKind::InvalidInput));
                }
            }
        }

        Ok(CmdArgs {
            config: (!config.is_empty()).then_some(config),
            once,
            dry_run,
        })
    }
}

#[cfg(test)]
mod test {
    use super::CmdArgs;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let parsed = CmdArgs::parse(args(&["flashnews"])).unwrap();
        assert_eq!(parsed.config, None);
        assert!(!parsed.once);
        assert!(!parsed.dry_run);
    }

    #[test]
    fn test_all_options() {
        let parsed =
            CmdArgs::parse(args(&["flashnews", "-c", "relay.json", "--once", "-d"])).unwrap();
        assert_eq!(parsed.config.as_deref(), Some("relay.json"));
        assert!(parsed.once);
        assert!(parsed.dry_run);
    }

    #[test]
    fn test_unknown_option() {
        assert!(CmdArgs::parse(args(&["flashnews", "--bogus"])).is_err());
    }
}
