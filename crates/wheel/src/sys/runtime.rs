use crate::events::AppEvent;
use async_channel::Sender;
use tokio::runtime::Handle;

pub fn start_background_services(runtime: &Handle, tx: Sender<AppEvent>) {
    {
        let tx = tx.clone();
        runtime.spawn(async move {
            crate::sys::server::run_server(tx).await;
        });
    }

    runtime.spawn(async move {
        crate::config::run_async_watcher(tx).await;
    });
}
