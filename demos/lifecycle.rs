//! Lifecycle Example
//!
//! A `Ticker` only produces ticks while somebody listens. It implements
//! `ActivationAware`, so the registry tells it when `tick` gains its first
//! listener (start the timer task) and when it loses its last one (stop it).
//!
//! Listeners run under **concurrent** dispatch: every listener is its own
//! Tokio task, so a slow or failing listener never blocks the ticker.

use std::{
    sync::{Arc, OnceLock, Weak},
    time::Duration,
};

use heralds::{monitors::ListenerMonitor, *};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

struct Ticker {
    events: EventRegistry<Ticker, u64>,
    me: Weak<Ticker>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl EventSource for Ticker {
    fn event_set() -> &'static EventSet {
        static SET: OnceLock<EventSet> = OnceLock::new();
        SET.get_or_init(|| EventSet::new().declare_event("tick"))
    }

    fn activation(&self) -> Option<&dyn ActivationAware> {
        Some(self)
    }
}

impl ActivationAware for Ticker {
    fn activate_event(&self, name: &EventName) {
        println!("[{name}] activated, starting timer");
        let me = self.me.clone();
        let timer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(20));
            for n in 0.. {
                interval.tick().await;
                let Some(ticker) = me.upgrade() else { break };
                if let Err(e) = ticker.events.emit("tick", n) {
                    eprintln!("tick failed: {e}");
                }
            }
        });
        *self.timer.lock() = Some(timer);
    }

    fn deactivate_event(&self, name: &EventName) {
        println!("[{name}] deactivated, stopping timer");
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dispatcher = Config::default().dispatcher();
    println!("dispatch mode: {}", dispatcher.mode());

    let ticker = Arc::new_cyclic(|me| Ticker {
        events: EventRegistry::new(me.clone(), dispatcher),
        me: me.clone(),
        timer: Mutex::new(None),
    });
    let monitor = ListenerMonitor::new();
    ticker.events.monitor(monitor.clone());

    let printer = ticker.events.on(
        ["tick"],
        Listener::new(|_: &Ticker, n: &u64| {
            println!("tick {n}");
            Ok(())
        }),
    )?;
    ticker.events.once(
        ["tick"],
        Listener::new(|_: &Ticker, n: &u64| {
            println!("first tick seen: {n}");
            Ok(())
        }),
    )?;
    ticker.events.on(
        ["tick"],
        Listener::new(|_: &Ticker, n: &u64| {
            if n % 3 == 2 {
                return Err(Error::listener("tick", format!("{n} is unlucky")));
            }
            Ok(())
        }),
    )?;

    tokio::time::sleep(Duration::from_millis(110)).await;

    ticker.events.remove_listener("tick", &printer)?;
    println!("printer removed, {} listeners left", ticker.events.listener_count("tick")?);
    tokio::time::sleep(Duration::from_millis(50)).await;

    ticker.events.teardown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    println!("stats: {:?}", monitor.stats("tick"));
    println!("Done");
    Ok(())
}
