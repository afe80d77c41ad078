#![allow(unused_crate_dependencies)]
#![allow(clippy::print_stdout)]

//! Reads and subscribes to a simulated heart rate sensor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};

use gattc::*;

#[derive(Clone, Debug, clap::Parser)]
struct Args {
    /// Peripheral identifier.
    #[arg(short, long, default_value = "c0ffee000001")]
    peripheral: String,

    /// Number of notifications to receive before unsubscribing.
    #[arg(short, long, default_value_t = 5)]
    count: usize,

    /// Notification interval in milliseconds.
    #[arg(short, long, default_value_t = 250)]
    interval: u64,
}

/// Simulated sensor. Commands are answered asynchronously on the event
/// channel, the way a radio transport would answer them.
#[derive(Debug)]
struct Sensor {
    tx: mpsc::UnboundedSender<(Key, Event)>,
    interval: Duration,
    notify: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Sensor {
    fn send(&self, k: &Key, evt: Event) {
        let _ = self.tx.send((k.clone(), evt));
    }

    /// Heart Rate Measurement value with 8-bit BPM format.
    fn measurement(bpm: u8) -> [u8; 2] {
        [0x00, bpm]
    }
}

impl Transport for Sensor {
    fn read(&self, k: &Key, value_handle: Handle) {
        self.send(k, Event::Read(Value::reply(Self::measurement(72), value_handle)));
    }

    fn write(&self, k: &Key, _: &[u8], without_response: bool, _: Handle) {
        if !without_response {
            self.send(k, Event::Write);
        }
    }

    fn broadcast(&self, k: &Key, _: bool) {
        self.send(k, Event::Broadcast);
    }

    fn notify(&self, k: &Key, enable: bool, value_handle: Handle) {
        let mut task = self.notify.lock();
        if let Some(t) = task.take() {
            t.abort();
        }
        if enable {
            let (tx, k, period) = (self.tx.clone(), k.clone(), self.interval);
            *task = Some(tokio::spawn(async move {
                let mut it = tokio::time::interval(period);
                for bpm in (70..90).cycle() {
                    it.tick().await;
                    let v = Value::notification(Self::measurement(bpm), value_handle);
                    if tx.send((k.clone(), Event::Read(v))).is_err() {
                        return;
                    }
                }
            }));
        }
        self.send(k, Event::Notify);
    }

    fn discover_descriptors(&self, k: &Key, value_handle: Handle) {
        let ds = [0x2902, 0x2901]
            .into_iter()
            .zip(value_handle.0 + 1..)
            .filter_map(|(u, h)| Some(Descriptor::new(Uuid::from_u16(u)?, Handle(h))))
            .collect();
        self.send(k, Event::DescriptorsDiscover(ds));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sensor = Arc::new(Sensor {
        tx,
        interval: Duration::from_millis(args.interval),
        notify: parking_lot::Mutex::default(),
    });
    let hrm = Arc::new(Characteristic::new(
        sensor,
        Decl {
            peripheral: args.peripheral,
            service: Uuid::from_u16(0x180D).ok_or_else(|| anyhow::anyhow!("invalid uuid"))?,
            uuid: Uuid::from_u16(0x2A37).ok_or_else(|| anyhow::anyhow!("invalid uuid"))?,
            props: CharProp::READ | CharProp::NOTIFY,
            value_handle: Handle(0x0003),
            start_handle: Handle(0x0002),
            end_handle: Handle(0x0004),
        },
    ));
    println!("{hrm}");

    // Routes transport events to characteristic handles by key
    let registry = HashMap::from([(hrm.key().clone(), Arc::clone(&hrm))]);
    let router = tokio::spawn(async move {
        while let Some((k, evt)) = rx.recv().await {
            match registry.get(&k) {
                Some(c) => c.handle_event(evt),
                None => debug!("Event for unknown characteristic {k}"),
            }
        }
    });

    let ds = hrm.discover_descriptors_async().await?;
    for d in &ds {
        info!("Descriptor {} ({})", d.uuid(), d.name().unwrap_or("unknown"));
    }
    hrm.set_descriptors(ds);

    let v = hrm.read_async().await?;
    println!("Read: {} BPM", v.data[1]);

    let mut values = hrm.values();
    hrm.subscribe_async().await?;
    let mut n = 0;
    loop {
        tokio::select! {
            v = values.next() => match v {
                Some(v) if v.is_notification => {
                    println!("Notification: {} BPM", v.data[1]);
                    n += 1;
                    if n == args.count {
                        break;
                    }
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    hrm.unsubscribe_async().await?;
    router.abort();
    Ok(())
}
