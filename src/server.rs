//! Device-side HTTP + WebSocket server.
//!
//! Endpoints mirror the board's long-standing surface: `/status`, the four
//! lock on/off handlers, `/get_sample_settings` / `/set_sample_settings`,
//! and the `/ws` stream. The WebSocket side implements the core's
//! [`PacketSink`] (text metadata then binary payload, broadcast) and feeds
//! its [`ControlSource`] from inbound one-byte frames.
//!
//! Everything in this module runs on the HTTP server's own tasks; the only
//! contact with the sampling loop is through the lock-free statics below.

use std::sync::{Arc, Mutex};

use core::sync::atomic::{AtomicU32, Ordering};

use esp_idf_svc::hal::gpio::{Gpio22, Gpio23, Output, PinDriver};
use esp_idf_svc::http::server::ws::EspHttpWsDetachedSender;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::{Read, Write};
use esp_idf_svc::sys::EspError;
use esp_idf_svc::ws::FrameType;

use log::info;

use remote_laser_scope::transport::decode_control_frame;
use remote_laser_scope::{
    ControlSource, LockOutputs, PacketMeta, PacketSink, SampleSettings, SettingsMessage,
};

/// Inbound settings body limit (matches the old JSON handler's cap).
const MAX_SETTINGS_BODY: usize = 1024;

/// Attached viewers. Detached senders so packet broadcasts happen from the
/// sampling loop's task, not from a request handler.
static VIEWERS: Mutex<Vec<EspHttpWsDetachedSender>> = Mutex::new(Vec::new());

/// Most recent control byte, single slot. Bit 8 marks "occupied" so a 0x00
/// level is distinguishable from empty; last writer wins, like the trigger
/// latch.
static CONTROL_SLOT: AtomicU32 = AtomicU32::new(0);

const CONTROL_OCCUPIED: u32 = 0x100;

/// Handles the sampling loop uses to reach the WebSocket layer.
pub fn transport_handles() -> (WsSink, WsControl) {
    (WsSink, WsControl)
}

/// [`PacketSink`] over the attached viewers.
pub struct WsSink;

impl WsSink {
    fn prune(viewers: &mut Vec<EspHttpWsDetachedSender>) {
        // Release improperly-closed connections before deciding anything.
        viewers.retain(|viewer| !viewer.is_closed());
    }
}

impl PacketSink for WsSink {
    fn has_consumers(&self) -> bool {
        let mut viewers = VIEWERS.lock().unwrap();
        Self::prune(&mut viewers);
        !viewers.is_empty()
    }

    fn ready_for_all(&self) -> bool {
        // The IDF server exposes liveness, not queue depth; a viewer whose
        // socket died mid-window fails the send below, and that window is
        // dropped whole like any other congestion.
        let mut viewers = VIEWERS.lock().unwrap();
        Self::prune(&mut viewers);
        !viewers.is_empty()
    }

    fn send_meta(&mut self, meta: &PacketMeta) {
        if let Some(json) = meta.to_json() {
            let mut viewers = VIEWERS.lock().unwrap();
            for viewer in viewers.iter_mut() {
                let _ = viewer.send(FrameType::Text(false), json.as_bytes());
            }
        }
    }

    fn send_samples(&mut self, samples: &[u8]) {
        let mut viewers = VIEWERS.lock().unwrap();
        for viewer in viewers.iter_mut() {
            let _ = viewer.send(FrameType::Binary(false), samples);
        }
    }
}

/// [`ControlSource`] fed by inbound binary frames.
pub struct WsControl;

impl ControlSource for WsControl {
    fn try_recv(&mut self) -> Option<u8> {
        match CONTROL_SLOT.swap(0, Ordering::AcqRel) {
            0 => None,
            slot => Some((slot & 0xFF) as u8),
        }
    }
}

/// The HTTP server and the lock pins its handlers drive.
pub struct ScopeServer {
    _server: EspHttpServer<'static>,
}

impl ScopeServer {
    pub fn start(
        settings: &'static SampleSettings,
        locks: &'static LockOutputs,
        name: &'static str,
        slow_pin: PinDriver<'static, Gpio23, Output>,
        fast_pin: PinDriver<'static, Gpio22, Output>,
    ) -> Result<Self, EspError> {
        let mut server = EspHttpServer::new(&Configuration::default())?;
        let slow_pin = Arc::new(Mutex::new(slow_pin));
        let fast_pin = Arc::new(Mutex::new(fast_pin));

        server.fn_handler("/", Method::Get, |request| {
            request
                .into_ok_response()?
                .write_all(include_str!("../web/index.html").as_bytes())
        })?;

        server.fn_handler("/status", Method::Get, move |request| {
            let body = locks.status(name).to_json().unwrap_or_default();
            request
                .into_response(200, None, &[("Content-Type", "text/plain")])?
                .write_all(body.as_bytes())
        })?;

        {
            let slow_pin = slow_pin.clone();
            server.fn_handler("/enable_slow", Method::Post, move |request| {
                let _ = slow_pin.lock().unwrap().set_high();
                locks.set_slow(true);
                request.into_ok_response().map(|_| ())
            })?;
        }
        server.fn_handler("/disable_slow", Method::Post, move |request| {
            let _ = slow_pin.lock().unwrap().set_low();
            locks.set_slow(false);
            request.into_ok_response().map(|_| ())
        })?;
        {
            let fast_pin = fast_pin.clone();
            server.fn_handler("/enable_fast", Method::Post, move |request| {
                let _ = fast_pin.lock().unwrap().set_high();
                locks.set_fast(true);
                request.into_ok_response().map(|_| ())
            })?;
        }
        server.fn_handler("/disable_fast", Method::Post, move |request| {
            let _ = fast_pin.lock().unwrap().set_low();
            locks.set_fast(false);
            request.into_ok_response().map(|_| ())
        })?;

        server.fn_handler("/get_sample_settings", Method::Get, move |request| {
            let body = settings.read_message().to_json().unwrap_or_default();
            request
                .into_response(200, None, &[("Content-Type", "text/plain")])?
                .write_all(body.as_bytes())
        })?;

        server.fn_handler("/set_sample_settings", Method::Post, move |mut request| {
            // Accumulate the whole body first; a segmented request may
            // arrive in several reads.
            let mut buf = [0u8; MAX_SETTINGS_BODY];
            let mut len = 0;
            while len < buf.len() {
                match request.read(&mut buf[len..]) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => len += n,
                }
            }
            if let Some(msg) =
                core::str::from_utf8(&buf[..len]).ok().and_then(SettingsMessage::from_json)
            {
                settings.request(msg.resolution, msg.duration);
            }
            // Acknowledge by pointing at the read endpoint, clamped values
            // and all.
            request
                .into_response(302, None, &[("Location", "/get_sample_settings")])
                .map(|_| ())
        })?;

        server.ws_handler("/ws", move |ws| {
            if ws.is_new() {
                let sender = ws.create_detached_sender()?;
                let mut viewers = VIEWERS.lock().unwrap();
                viewers.push(sender);
                info!("viewer connected ({} attached)", viewers.len());
            } else if ws.is_closed() {
                let mut viewers = VIEWERS.lock().unwrap();
                WsSink::prune(&mut viewers);
                info!("viewer disconnected ({} attached)", viewers.len());
            } else {
                // Inbound control: one byte per binary frame, anything
                // else is discarded silently.
                let (frame_type, len) = match ws.recv(&mut []) {
                    Ok(frame) => frame,
                    Err(_) => return Ok(()),
                };
                if matches!(frame_type, FrameType::Binary(false)) && len <= 8 {
                    let mut data = [0u8; 8];
                    ws.recv(&mut data[..len])?;
                    if let Some(level) = decode_control_frame(&data[..len]) {
                        CONTROL_SLOT.store(CONTROL_OCCUPIED | level as u32, Ordering::Release);
                    }
                }
            }
            Ok::<(), EspError>(())
        })?;

        Ok(Self { _server: server })
    }
}
