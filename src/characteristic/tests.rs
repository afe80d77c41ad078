use std::sync::atomic::{AtomicUsize, Ordering};

use matches::assert_matches;

use crate::host::mock::{Command, Recorder};

use super::*;

const HRS: u16 = 0x180D;
const HRM: u16 = 0x2A37;

fn decl(uuid: Uuid) -> Decl {
    Decl {
        peripheral: "e4a1c2b3d4f5".to_owned(),
        service: Uuid::from_u16(HRS).unwrap(),
        uuid,
        props: CharProp::READ | CharProp::WRITE_REQ | CharProp::NOTIFY,
        value_handle: Handle(0x0010),
        start_handle: Handle(0x000F),
        end_handle: Handle(0x0012),
    }
}

fn hrm() -> (Arc<Recorder>, Characteristic<Recorder>) {
    let t = Arc::new(Recorder::new());
    let c = Characteristic::new(Arc::clone(&t), decl(Uuid::from_u16(HRM).unwrap()));
    (t, c)
}

/// Callback that appends its argument to a shared log.
fn log<A: Send + 'static>() -> (Arc<parking_lot::Mutex<Vec<A>>>, impl Fn() -> Option<Callback<A>>) {
    let v = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mk = {
        let v = Arc::clone(&v);
        move || {
            let v = Arc::clone(&v);
            Some(Callback::new(move |a| v.lock().push(a)))
        }
    };
    (v, mk)
}

#[test]
fn construct() {
    let (t, c) = hrm();
    assert!(t.is_empty());
    assert_eq!(c.name(), Some("Heart Rate Measurement"));
    assert_eq!(c.typ(), Some("org.bluetooth.characteristic.heart_rate_measurement"));
    assert_eq!(c.peripheral_id(), "e4a1c2b3d4f5");
    assert_eq!(c.service_uuid(), Uuid::from_u16(HRS).unwrap());
    assert_eq!(c.uuid(), Uuid::from_u16(HRM).unwrap());
    assert_eq!(c.value_handle(), Handle(0x0010));
    assert_eq!(c.start_handle(), Handle(0x000F));
    assert_eq!(c.end_handle(), Handle(0x0012));
    assert!(c.descriptors().is_none());

    let vendor = "6e400003b5a3f393e0a9e50e24dcca9e".parse().unwrap();
    let c = Characteristic::new(Arc::clone(&t), decl(vendor));
    assert_eq!((c.name(), c.typ()), (None, None));
    assert!(t.is_empty());
}

#[test]
fn construct_custom_table() {
    let table = Table::from_json(
        r#"{"6e400003b5a3f393e0a9e50e24dcca9e": {"name": "UART TX", "type": "com.example.uart.tx"}}"#,
        "{}",
    )
    .unwrap();
    let cfg = Config {
        table: Box::leak(Box::new(table)),
        ..Config::default()
    };
    let t = Arc::new(Recorder::new());
    let c = Characteristic::with_config(
        Arc::clone(&t),
        decl("6e400003b5a3f393e0a9e50e24dcca9e".parse().unwrap()),
        cfg,
    );
    assert_eq!(c.name(), Some("UART TX"));
    let c = Characteristic::with_config(t, decl(Uuid::from_u16(HRM).unwrap()), cfg);
    assert_eq!(c.name(), None);
}

#[test]
fn display() {
    let (_, c) = hrm();
    assert_eq!(
        c.to_string(),
        r#"{"uuid":"2a37","name":"Heart Rate Measurement","type":"org.bluetooth.characteristic.heart_rate_measurement","properties":["read","write","notify"]}"#
    );
    let t = Arc::new(Recorder::new());
    let mut d = decl("6e400003b5a3f393e0a9e50e24dcca9e".parse().unwrap());
    d.props = CharProp::empty();
    assert_eq!(
        Characteristic::new(t, d).to_string(),
        r#"{"uuid":"6e400003b5a3f393e0a9e50e24dcca9e","name":null,"type":null,"properties":[]}"#
    );
}

#[test]
fn read() {
    let (t, c) = hrm();
    let (got, cb) = log();
    c.read(cb());
    assert_eq!(
        t.take(),
        [Command::Read {
            key: c.key().clone(),
            value_handle: Handle(0x0010)
        }]
    );
    assert_eq!(c.pending(EventKind::Read), 1);

    c.handle_event(Event::Read(Value::reply([0x06, 0x48], Handle(0x0010))));
    assert_eq!(*got.lock(), [Value::reply([0x06, 0x48], Handle(0x0010))]);
    assert_eq!(c.pending(EventKind::Read), 0);

    // Deregistered after the first reply
    c.handle_event(Event::Read(Value::reply([0x06, 0x49], Handle(0x0010))));
    assert_eq!(got.lock().len(), 1);
}

#[test]
fn read_skips_notifications() {
    let (_, c) = hrm();
    let (got, cb) = log();
    c.read(cb());
    for i in 0..3 {
        c.handle_event(Event::Read(Value::notification([i], Handle(0x0010))));
        assert!(got.lock().is_empty());
        assert_eq!(c.pending(EventKind::Read), 1);
    }
    c.handle_event(Event::Read(Value::reply([9], Handle(0x0010))));
    assert_eq!(*got.lock(), [Value::reply([9], Handle(0x0010))]);
}

#[test]
fn read_without_reply_stays_pending() {
    // No timeout: an unanswered read keeps its callback registered.
    let (_, c) = hrm();
    let (got, cb) = log::<Value>();
    c.read(cb());
    c.handle_event(Event::Write);
    c.handle_event(Event::Notify);
    c.handle_event(Event::Read(Value::notification([1], Handle(0x0010))));
    assert!(got.lock().is_empty());
    assert_eq!(c.pending(EventKind::Read), 1);
}

#[test]
fn concurrent_reads() {
    // Without request ids, the first reply goes to the oldest read.
    let (t, c) = hrm();
    let (first, cb1) = log();
    let (second, cb2) = log();
    c.read(cb1());
    c.read(cb2());
    assert_eq!(t.len(), 2);

    c.handle_event(Event::Read(Value::reply([1], Handle(0x0010))));
    assert_eq!(*first.lock(), [Value::reply([1], Handle(0x0010))]);
    assert!(second.lock().is_empty());
    assert_eq!(c.pending(EventKind::Read), 1);

    c.handle_event(Event::Read(Value::reply([2], Handle(0x0010))));
    assert_eq!(first.lock().len(), 1);
    assert_eq!(*second.lock(), [Value::reply([2], Handle(0x0010))]);
}

#[test]
fn fire_and_forget() {
    let (t, c) = hrm();
    c.read(None);
    c.write([1_u8], false, None).unwrap();
    c.broadcast(true, None);
    c.notify(true, None);
    c.discover_descriptors(None);
    assert_eq!(t.len(), 5);
    for kind in [
        EventKind::Read,
        EventKind::Write,
        EventKind::Broadcast,
        EventKind::Notify,
        EventKind::DescriptorsDiscover,
    ] {
        assert_eq!(c.pending(kind), 0);
    }
    c.handle_event(Event::Read(Value::reply([1], Handle(0x0010))));
    c.handle_event(Event::Write);
}

#[test]
fn write() {
    let (t, c) = hrm();
    let (got, cb) = log();
    c.write(vec![0x01_u8, 0x00], true, cb()).unwrap();
    assert_eq!(
        t.take(),
        [Command::Write {
            key: c.key().clone(),
            data: vec![0x01, 0x00],
            without_response: true,
            value_handle: Handle(0x0010),
        }]
    );
    assert!(got.lock().is_empty());
    c.handle_event(Event::Write);
    c.handle_event(Event::Write);
    assert_eq!(got.lock().len(), 1);
}

#[test]
fn write_rejects_text() {
    let (t, c) = hrm();
    let (got, cb) = log();
    assert_matches!(c.write("hello", false, cb()), Err(Error::NotBuffer));
    assert_matches!(c.write(String::from("x"), true, None), Err(Error::NotBuffer));
    assert!(t.is_empty());
    assert_eq!(c.pending(EventKind::Write), 0);
    c.handle_event(Event::Write);
    assert!(got.lock().is_empty());
}

#[test]
fn write_lenient_text() {
    let t = Arc::new(Recorder::new());
    let cfg = Config {
        strict_payload: false,
        ..Config::default()
    };
    let c = Characteristic::with_config(Arc::clone(&t), decl(Uuid::from_u16(HRM).unwrap()), cfg);
    c.write("hi", false, None).unwrap();
    assert_matches!(&t.take()[..], [Command::Write { data, .. }] if data == b"hi");
}

#[test]
fn no_payload_completions() {
    let (t, c) = hrm();
    let n = Arc::new(AtomicUsize::new(0));
    let cb = || {
        let n = Arc::clone(&n);
        Some(Callback::new(move |()| {
            n.fetch_add(1, Ordering::Relaxed);
        }))
    };
    c.broadcast(true, cb());
    c.notify(false, cb());
    assert_eq!(
        t.take(),
        [
            Command::Broadcast {
                key: c.key().clone(),
                enable: true
            },
            Command::Notify {
                key: c.key().clone(),
                enable: false,
                value_handle: Handle(0x0010)
            },
        ]
    );
    assert_eq!(n.load(Ordering::Relaxed), 0);

    // Each completion is delivered once and only to its own kind
    c.handle_event(Event::Notify);
    assert_eq!(n.load(Ordering::Relaxed), 1);
    assert_eq!(c.pending(EventKind::Broadcast), 1);
    c.handle_event(Event::Notify);
    assert_eq!(n.load(Ordering::Relaxed), 1);
    c.handle_event(Event::Broadcast);
    c.handle_event(Event::Broadcast);
    assert_eq!(n.load(Ordering::Relaxed), 2);
}

#[test]
fn subscribe_is_notify() {
    let (t1, c1) = hrm();
    let (t2, c2) = hrm();
    let (g1, cb1) = log();
    let (g2, cb2) = log();

    c1.subscribe(cb1());
    c1.unsubscribe(cb1());
    c2.notify(true, cb2());
    c2.notify(false, cb2());
    assert_eq!(t1.commands(), t2.commands());
    assert_matches!(
        &t1.commands()[..],
        [
            Command::Notify { enable: true, .. },
            Command::Notify { enable: false, .. }
        ]
    );

    for c in [&c1, &c2] {
        c.handle_event(Event::Notify);
    }
    assert_eq!((g1.lock().len(), g2.lock().len()), (1, 1));
    for c in [&c1, &c2] {
        c.handle_event(Event::Notify);
        c.handle_event(Event::Notify);
    }
    assert_eq!((g1.lock().len(), g2.lock().len()), (2, 2));
}

#[test]
fn discover_descriptors() {
    let (t, c) = hrm();
    let (got, cb) = log();
    c.discover_descriptors(cb());
    assert_eq!(
        t.take(),
        [Command::DiscoverDescriptors {
            key: c.key().clone(),
            value_handle: Handle(0x0010)
        }]
    );
    let ds: Vec<Descriptor> = [0x2902, 0x2901, 0x2904]
        .into_iter()
        .zip(0x0011..)
        .map(|(u, h)| Descriptor::new(Uuid::from_u16(u).unwrap(), Handle(h)))
        .collect();
    c.handle_event(Event::DescriptorsDiscover(ds.clone()));
    assert_eq!(*got.lock(), [ds.clone()]);
    assert_eq!(got.lock()[0][0].name(), Some("Client Characteristic Configuration"));

    // Discovery does not populate the handle
    assert!(c.descriptors().is_none());
    c.set_descriptors(ds.clone());
    assert_eq!(c.descriptors(), Some(ds));
}

#[test]
fn callback_may_issue_requests() {
    let t = Arc::new(Recorder::new());
    let c = Arc::new(Characteristic::new(
        Arc::clone(&t),
        decl(Uuid::from_u16(HRM).unwrap()),
    ));
    let c2 = Arc::clone(&c);
    c.read(Some(Callback::new(move |_| c2.read(None))));
    c.handle_event(Event::Read(Value::reply([1], Handle(0x0010))));
    assert_eq!(t.len(), 2);
}

#[test]
fn value_listeners() {
    let (_, c) = hrm();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let id = c.on_value({
        let seen = Arc::clone(&seen);
        move |v| seen.lock().push(v.clone())
    });
    c.read(None);
    c.handle_event(Event::Read(Value::notification([1], Handle(0x0010))));
    c.handle_event(Event::Read(Value::reply([2], Handle(0x0010))));
    c.handle_event(Event::Notify);
    assert_eq!(
        *seen.lock(),
        [
            Value::notification([1], Handle(0x0010)),
            Value::reply([2], Handle(0x0010))
        ]
    );
    assert!(c.remove_listener(id));
    c.handle_event(Event::Read(Value::notification([3], Handle(0x0010))));
    assert_eq!(seen.lock().len(), 2);
}

#[tokio::test]
async fn read_async() {
    let (t, c) = hrm();
    let r = c.read_async();
    assert_eq!(t.len(), 1);
    c.handle_event(Event::Read(Value::notification([1], Handle(0x0010))));
    c.handle_event(Event::Read(Value::reply([2], Handle(0x0010))));
    assert_eq!(r.await.unwrap(), Value::reply([2], Handle(0x0010)));
}

#[tokio::test]
async fn write_async() {
    let (t, c) = hrm();
    let r = c.write_async(&[1_u8, 2, 3], false);
    c.handle_event(Event::Write);
    r.await.unwrap();

    // Rejected before the transport is contacted
    let n = t.len();
    assert_matches!(c.write_async("text", false).await, Err(Error::NotBuffer));
    assert_eq!(t.len(), n);
}

#[tokio::test]
async fn async_completions() {
    let (t, c) = hrm();
    let b = c.broadcast_async(true);
    let s = c.subscribe_async();
    let u = c.unsubscribe_async();
    let d = c.discover_descriptors_async();
    assert_eq!(t.len(), 4);
    c.handle_event(Event::DescriptorsDiscover(vec![Descriptor::new(
        Uuid::from_u16(0x2902).unwrap(),
        Handle(0x0011),
    )]));
    c.handle_event(Event::Notify);
    c.handle_event(Event::Notify);
    c.handle_event(Event::Broadcast);
    b.await.unwrap();
    s.await.unwrap();
    u.await.unwrap();
    assert_eq!(d.await.unwrap().len(), 1);
}

#[tokio::test]
async fn async_closed() {
    let (_, c) = hrm();
    let r = c.read_async();
    drop(c);
    assert_matches!(r.await, Err(Error::Closed(EventKind::Read)));
}

#[tokio::test]
async fn dropped_reply_keeps_request() {
    // Dropping the future does not withdraw the request
    let (_, c) = hrm();
    drop(c.read_async());
    let r = c.read_async();
    assert_eq!(c.pending(EventKind::Read), 2);
    c.handle_event(Event::Read(Value::reply([1], Handle(0x0010))));
    assert_eq!(c.pending(EventKind::Read), 1);
    c.handle_event(Event::Read(Value::reply([2], Handle(0x0010))));
    assert_eq!(r.await.unwrap().data, [2]);
}

#[tokio::test]
async fn values_stream() {
    let (_, c) = hrm();
    let mut vs = c.values();
    c.subscribe(None);
    c.handle_event(Event::Notify);
    for i in 0..3 {
        c.handle_event(Event::Read(Value::notification([i], Handle(0x0010))));
    }
    for i in 0..3 {
        assert_eq!(vs.next().await.unwrap().data, [i]);
    }
    drop(c);
    assert!(vs.next().await.is_none());
}
