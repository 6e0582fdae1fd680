use clap::Parser;
use single_instance::DEFAULT_LOCK_PATH;
use single_instance::InstanceLock;
use single_instance::InstanceRole;
use single_instance::NotifierAddress;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::OnceLock;
mod auth;
mod gui;
use crate::auth::CLIENT_ID_ENV;
use crate::gui::GuiNotifier;
use crate::gui::ShellDemoWindow;

#[derive(Parser, Debug)]
#[command(name = "aps-shell-demo")]
#[command(about = "Single instance APS OAuth shell demo", long_about = None)]
struct Cli {
    /// Message for the running instance, usually the OAuth callback URL
    ///
    /// Ignored when no other instance is running. Only the first value is
    /// forwarded, the rest are ignored.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    message: Vec<String>,

    /// Lock file deciding which process is the primary instance
    #[arg(short, long, default_value = DEFAULT_LOCK_PATH)]
    lock_file: PathBuf,

    /// APS application client id
    #[arg(short, long, env = CLIENT_ID_ENV)]
    client_id: Option<String>,
}

impl Cli {
    fn message(&self) -> Option<&str> {
        self.message.first().map(String::as_str)
    }
}

fn main() -> ExitCode {
    #[cfg(debug_assertions)]
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("aps_shell_demo=trace,single_instance=trace"),
    )
    .init();

    #[cfg(not(debug_assertions))]
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("aps_shell_demo=warn,single_instance=warn"),
    )
    .init();

    let cli = Cli::parse();

    let role = match single_instance::acquire(&cli.lock_file) {
        Ok(role) => role,
        Err(e) => {
            eprintln!("Failed to determine instance role: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match role {
        InstanceRole::Primary(lock) => match run_primary(cli, lock) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{}", e);
                ExitCode::FAILURE
            }
        },
        InstanceRole::Secondary => {
            let address = NotifierAddress::default();
            match forward_to_primary(cli.message(), |message| {
                single_instance::call(&address, message)
            }) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Failed to call the running instance: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Runs the window until it is closed, then tears down the notifier and
/// releases the lock
fn run_primary(cli: Cli, lock: InstanceLock) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Primary instance, lock {}", lock.path().display());
    if cli.message().is_some() {
        log::debug!("No instance to forward the message to, ignoring it");
    }

    let (sender, receiver) = std::sync::mpsc::channel();
    let context = Arc::new(OnceLock::new());
    let registration = single_instance::register(
        NotifierAddress::default(),
        GuiNotifier::new(sender, context.clone()),
    )?;
    log::debug!("Listening for messages on {}", registration.address().bus_name);

    let window = ShellDemoWindow::new(receiver, cli.client_id);
    let result = eframe::run_native(
        gui::WINDOW_TITLE,
        gui::native_options(),
        Box::new(move |cc| {
            let _ = context.set(cc.egui_ctx.clone());
            Ok(Box::new(window))
        }),
    );

    if let Err(e) = registration.unregister() {
        log::warn!("Failed to unregister notifier: {}", e);
    }
    lock.release();

    result?;
    Ok(())
}

/// Hands `message` to `forward`, without a message there is nothing to do
fn forward_to_primary<F>(message: Option<&str>, forward: F) -> Result<(), single_instance::Error>
where
    F: FnOnce(&str) -> Result<(), single_instance::Error>,
{
    match message {
        Some(message) => {
            log::info!("Another instance is running, forwarding message");
            forward(message)
        }
        None => {
            log::info!("Another instance is running, nothing to forward");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_message_and_options() {
        let cli = Cli::try_parse_from([
            "aps-shell-demo",
            "--client-id",
            "abc",
            "--lock-file",
            "/tmp/other.pid",
            "apsshelldemo://oauth?code=xyz",
        ])
        .unwrap();

        assert_eq!(cli.message(), Some("apsshelldemo://oauth?code=xyz"));
        assert_eq!(cli.client_id.as_deref(), Some("abc"));
        assert_eq!(cli.lock_file, PathBuf::from("/tmp/other.pid"));
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["aps-shell-demo"]).unwrap();
        assert_eq!(cli.message(), None);
        assert_eq!(cli.lock_file, PathBuf::from("/tmp/apsshelldemo.pid"));
    }

    #[test]
    fn extra_arguments_are_ignored() {
        let cli = Cli::try_parse_from(["aps-shell-demo", "a", "b"]).unwrap();
        assert_eq!(cli.message(), Some("a"));

        let mut forwarded = None;
        forward_to_primary(cli.message(), |message| {
            forwarded = Some(message.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(forwarded.as_deref(), Some("a"));
    }

    #[test]
    fn no_message_skips_the_call() {
        let result = forward_to_primary(None, |_| panic!("should not call the primary"));
        assert!(result.is_ok());
    }

    #[test]
    fn message_is_forwarded_verbatim() {
        let mut forwarded = None;
        forward_to_primary(Some("hello"), |message| {
            forwarded = Some(message.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(forwarded.as_deref(), Some("hello"));
    }

    #[test]
    fn forward_failure_is_returned() {
        let result = forward_to_primary(Some("hello"), |_| {
            Err(single_instance::Error::NameTaken("das.apshelldemo.dbusserver".into()))
        });
        assert!(result.is_err());
    }
}
