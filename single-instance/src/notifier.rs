use futures::StreamExt;
use futures::executor::block_on;
use futures::future::AbortHandle;
use futures::future::abortable;
use std::sync::Arc;
use std::thread::JoinHandle;
use zbus::Connection;
use zbus::fdo::RequestNameFlags;
use zbus::fdo::RequestNameReply;
use zbus::interface;

use crate::Error;

pub const DEFAULT_BUS_NAME: &str = "das.apshelldemo.dbusserver";
pub const DEFAULT_OBJECT_PATH: &str = "/das/apsshelldemo/object";

/// Must match the name given to the `#[interface]` below
pub const INTERFACE_NAME: &str = "das.apsshelldemo";
pub const METHOD_NAME: &str = "doOAuth";

/// Messages which are echoes of the authorization flow itself, never shown
pub const RESERVED_MESSAGES: [&str; 3] = ["Return Unregistered", "Return Registered", "Return Raw"];

pub fn is_reserved_message(message: &str) -> bool {
    RESERVED_MESSAGES.contains(&message)
}

/// Where the primary instance listens on the session bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierAddress {
    pub bus_name: String,
    pub object_path: String,
}

impl Default for NotifierAddress {
    fn default() -> Self {
        Self {
            bus_name: DEFAULT_BUS_NAME.to_string(),
            object_path: DEFAULT_OBJECT_PATH.to_string(),
        }
    }
}

/// Receives notifier events in the primary instance.
///
/// Calls come from the D-Bus executor thread, implementations should hand
/// the event over to the GUI thread instead of touching widgets directly.
pub trait NotifierHandler: Send + Sync + 'static {
    /// A secondary instance forwarded a message
    fn message_received(&self, message: String);

    /// Another connection took over the bus name
    fn name_lost(&self) {}
}

/// Live registration of the notifier on the session bus.
///
/// Call `unregister` on shutdown. Dropping the registration closes the
/// connection which also gives up the name.
pub struct Registration {
    connection: Connection,
    address: NotifierAddress,
    watcher: AbortHandle,
    watcher_thread: Option<JoinHandle<()>>,
}

impl Registration {
    pub fn address(&self) -> &NotifierAddress {
        &self.address
    }

    /// Removes the object and releases the bus name
    pub fn unregister(mut self) -> Result<(), Error> {
        self.stop_watcher();

        block_on(async {
            self.connection
                .object_server()
                .remove::<NotifierService, _>(self.address.object_path.as_str())
                .await?;
            self.connection
                .release_name(self.address.bus_name.as_str())
                .await?;
            Ok::<(), Error>(())
        })?;

        log::info!("Unregistered notifier {}", self.address().bus_name);
        Ok(())
    }

    fn stop_watcher(&mut self) {
        self.watcher.abort();
        if let Some(thread) = self.watcher_thread.take() {
            if thread.join().is_err() {
                log::error!("Name watcher thread panic");
            }
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}

/// Registers the notifier and claims the well-known bus name.
///
/// Fails with `Error::NameTaken` if some other connection already owns the
/// name. The name may be taken over by a later owner asking to replace it,
/// the handler then gets `name_lost`.
pub fn register(
    address: NotifierAddress,
    handler: impl NotifierHandler,
) -> Result<Registration, Error> {
    let handler: Arc<dyn NotifierHandler> = Arc::new(handler);

    let (connection, mut name_lost) = block_on(async {
        let connection = Connection::session().await.map_err(Error::Connect)?;

        connection
            .object_server()
            .at(
                address.object_path.as_str(),
                NotifierService {
                    handler: handler.clone(),
                },
            )
            .await?;

        // Subscribe before owning the name so a takeover can't slip past
        let name_lost = zbus::fdo::DBusProxy::new(&connection)
            .await?
            .receive_name_lost()
            .await?;

        let reply = connection
            .request_name_with_flags(
                address.bus_name.as_str(),
                RequestNameFlags::AllowReplacement | RequestNameFlags::DoNotQueue,
            )
            .await
            .map_err(|e| match e {
                zbus::Error::NameTaken => Error::NameTaken(address.bus_name.clone()),
                e => Error::DBus(e),
            })?;

        match reply {
            RequestNameReply::PrimaryOwner | RequestNameReply::AlreadyOwner => {
                Ok::<_, Error>((connection, name_lost))
            }
            _ => Err(Error::NameTaken(address.bus_name.clone())),
        }
    })?;

    log::info!(
        "Registered notifier {} at {}",
        address.bus_name,
        address.object_path
    );

    let bus_name = address.bus_name.clone();
    let (watcher, abort_handle) = abortable(async move {
        while let Some(signal) = name_lost.next().await {
            let args = signal.args()?;
            if args.name.as_str() == bus_name {
                log::warn!("Lost bus name {}", bus_name);
                handler.name_lost();
                break;
            }
        }
        Ok::<(), Error>(())
    });
    let watcher_thread = std::thread::spawn(move || {
        if let Ok(Err(e)) = block_on(watcher) {
            log::warn!("Name watcher stopped: {}", e);
        }
    });

    Ok(Registration {
        connection,
        address,
        watcher: abort_handle,
        watcher_thread: Some(watcher_thread),
    })
}

/// Forwards `message` to the primary instance with one blocking call
pub fn call(address: &NotifierAddress, message: &str) -> Result<(), Error> {
    block_on(async {
        let connection = Connection::session().await.map_err(Error::Connect)?;

        let proxy = zbus::Proxy::new(
            &connection,
            address.bus_name.as_str(),
            address.object_path.as_str(),
            INTERFACE_NAME,
        )
        .await?;

        proxy.call_method(METHOD_NAME, &(message,)).await?;
        log::debug!("Forwarded message to {}", address.bus_name);

        Ok::<(), Error>(())
    })
}

struct NotifierService {
    handler: Arc<dyn NotifierHandler>,
}

impl NotifierService {
    fn dispatch(&self, message: String) {
        if is_reserved_message(&message) {
            log::debug!("Ignoring reserved message '{}'", message);
            return;
        }
        self.handler.message_received(message);
    }
}

#[interface(name = "das.apsshelldemo")]
impl NotifierService {
    /// Called by a secondary instance, replies with nothing
    #[zbus(name = "doOAuth")]
    fn do_oauth(&self, message: String) {
        self.dispatch(message);
    }
}
