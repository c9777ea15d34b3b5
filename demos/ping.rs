//! Ping Example
//!
//! One host type, `Pinger`, declares a single `ping` event. The example walks
//! through the listener lifecycle under **immediate** dispatch, where every
//! listener runs before `emit` returns.
//!
//! # Key Concepts Demonstrated
//!
//! - Declaring events with `declare_events!`
//! - `on`, `once`, `emit` and `remove_listener`
//! - Meta-events (`first_listener`, `add_listener`, `remove_listener`,
//!   `no_listeners`) observed by a custom meta-listener
//! - The built-in `Tracer` monitor (run with `RUST_LOG=heralds=trace`)

use std::sync::Arc;

use heralds::{monitors::Tracer, *};
use tracing_subscriber::EnvFilter;

struct Pinger {
    events: EventRegistry<Pinger, u32>,
}
declare_events!(Pinger => "ping");

fn main() -> Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dispatcher = Config::default()
        .with_dispatch_mode(DispatchMode::Immediate)
        .dispatcher();
    let pinger = Arc::new_cyclic(|me| Pinger {
        events: EventRegistry::new(me.clone(), dispatcher),
    });
    pinger.events.monitor(Tracer);

    // Print every lifecycle change of `ping`
    let meta = pinger.events.meta("ping")?;
    for kind in MetaKind::ALL {
        meta.on_meta(kind, |event| {
            println!("  meta: {event}");
            Ok(())
        });
    }

    println!("on(ping)");
    let handle = pinger.events.on(
        ["ping"],
        Listener::new(|_: &Pinger, n: &u32| {
            println!("  ping #{n}");
            Ok(())
        }),
    )?;

    println!("emit(ping, 1)");
    pinger.events.emit("ping", 1)?;

    println!("remove_listener(ping)");
    pinger.events.remove_listener("ping", &handle)?;

    println!("emit(ping, 2) with no listeners");
    pinger.events.emit("ping", 2)?;

    println!("once(ping)");
    pinger.events.once(
        ["ping"],
        Listener::new(|_: &Pinger, n: &u32| {
            println!("  first ping only: #{n}");
            Ok(())
        }),
    )?;

    println!("emit(ping, 3)");
    pinger.events.emit("ping", 3)?;
    println!("emit(ping, 4)");
    pinger.events.emit("ping", 4)?;

    match pinger.events.emit("pong", 5) {
        Err(e) => println!("{e}"),
        Ok(()) => unreachable!("pong was never declared"),
    }

    println!("Done");
    Ok(())
}
