use single_instance::*;
use std::sync::mpsc::channel;

struct PrintHandler;

impl NotifierHandler for PrintHandler {
    fn message_received(&self, message: String) {
        println!("\n⚡ Message from secondary instance: {}", message);
    }

    fn name_lost(&self) {
        println!("\n✗ Bus name was taken over");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let message = std::env::args().nth(1);

    match acquire(DEFAULT_LOCK_PATH)? {
        InstanceRole::Primary(lock) => {
            let registration = register(NotifierAddress::default(), PrintHandler)?;
            println!("✓ This is the primary instance");
            println!("  Press Ctrl+C to exit.\n");

            let (tx, rx) = channel();
            ctrlc::set_handler(move || {
                let _ = tx.send(());
            })?;
            let _ = rx.recv();

            registration.unregister()?;
            lock.release();
        }
        InstanceRole::Secondary => {
            println!("✗ Another instance is already running");
            if let Some(message) = message {
                println!("  Forwarding '{}' to the primary instance...", message);
                call(&NotifierAddress::default(), &message)?;
            }
        }
    }

    Ok(())
}
