mod common;

use std::time::Duration;

use cloudwatcher::transport::LAST_DATA_PATH;
use cloudwatcher::{Connector, DeviceError, HttpConnector, TransportSettings};
use common::{FakeStation, FULL_BODY};

fn connector() -> HttpConnector {
    HttpConnector::new(TransportSettings {
        connect_timeout: Duration::from_secs(3),
        request_timeout: Duration::from_millis(500),
    })
}

#[test]
fn body_is_returned_verbatim() {
    let station = FakeStation::start(FULL_BODY);
    let transport = connector().open(&format!("http://{}", station.address())).unwrap();
    assert_eq!(transport.get(LAST_DATA_PATH).unwrap(), FULL_BODY);
}

#[test]
fn redirects_are_followed() {
    let station = FakeStation::start(FULL_BODY);
    let transport = connector().open(&format!("http://{}/", station.address())).unwrap();
    assert_eq!(transport.get("/moved").unwrap(), FULL_BODY);
}

#[test]
fn error_status_is_request_failure() {
    let station = FakeStation::start(FULL_BODY);
    station.set_status(503);
    let transport = connector().open(&format!("http://{}", station.address())).unwrap();
    match transport.get(LAST_DATA_PATH) {
        Err(DeviceError::RequestFailed(msg)) => assert!(msg.starts_with("status"), "{msg}"),
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[test]
fn slow_station_times_out() {
    let station = FakeStation::start(FULL_BODY);
    station.set_delay(Duration::from_secs(2));
    let transport = connector().open(&format!("http://{}", station.address())).unwrap();
    match transport.get(LAST_DATA_PATH) {
        Err(DeviceError::RequestFailed(msg)) => assert!(msg.starts_with("timeout"), "{msg}"),
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}
