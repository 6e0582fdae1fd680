//! These tests need a D-Bus session bus, run them with `cargo test -- --ignored`

use single_instance::Error;
use single_instance::NotifierAddress;
use single_instance::NotifierHandler;
use single_instance::call;
use single_instance::register;
use std::sync::mpsc::Sender;
use zbus::fdo::RequestNameFlags;
use zbus::fdo::RequestNameReply;
use std::sync::mpsc::channel;
use std::time::Duration;

#[derive(Debug, PartialEq)]
enum Event {
    Message(String),
    NameLost,
}

struct ChannelHandler(Sender<Event>);

impl NotifierHandler for ChannelHandler {
    fn message_received(&self, message: String) {
        let _ = self.0.send(Event::Message(message));
    }

    fn name_lost(&self) {
        let _ = self.0.send(Event::NameLost);
    }
}

fn test_address(suffix: &str) -> NotifierAddress {
    NotifierAddress {
        bus_name: format!("das.apshelldemo.test.{}{}", suffix, std::process::id()),
        ..NotifierAddress::default()
    }
}

#[test]
#[ignore]
fn test_call_reaches_registered_handler() -> Result<(), Box<dyn std::error::Error>> {
    let address = test_address("call");
    let (tx, rx) = channel();
    let registration = register(address.clone(), ChannelHandler(tx))?;

    call(&address, "Return Raw")?;
    call(&address, "hello")?;

    // Reserved message never arrives, calls are handled in order
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5))?,
        Event::Message("hello".to_string())
    );

    registration.unregister()?;
    Ok(())
}

#[test]
#[ignore]
fn test_second_registration_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let address = test_address("taken");
    let (tx, _rx) = channel();
    let registration = register(address.clone(), ChannelHandler(tx.clone()))?;

    match register(address.clone(), ChannelHandler(tx)) {
        Err(Error::NameTaken(name)) => assert_eq!(name, address.bus_name),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("name should already be taken"),
    }

    registration.unregister()?;
    Ok(())
}

#[test]
#[ignore]
fn test_call_without_primary_fails() {
    let address = test_address("missing");
    assert!(call(&address, "hello").is_err());
}

#[test]
#[ignore]
fn test_replacing_owner_triggers_name_lost() -> Result<(), Box<dyn std::error::Error>> {
    let address = test_address("replaced");
    let (tx, rx) = channel();
    let registration = register(address.clone(), ChannelHandler(tx))?;

    let other = zbus::blocking::Connection::session()?;
    let reply = other.request_name_with_flags(
        address.bus_name.as_str(),
        RequestNameFlags::ReplaceExisting | RequestNameFlags::DoNotQueue,
    )?;
    assert!(matches!(reply, RequestNameReply::PrimaryOwner));

    assert_eq!(rx.recv_timeout(Duration::from_secs(5))?, Event::NameLost);

    // Teardown still works once the name is gone
    registration.unregister()?;
    Ok(())
}
