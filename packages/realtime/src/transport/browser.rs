use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot;
use futures::StreamExt;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use super::Transport;
use crate::error::TransportError;

enum Inbound {
    Text(String),
    Error(String),
    Closed,
}

/// Keeps the JS callbacks alive for as long as the socket is open.
struct Callbacks {
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

/// WebSocket client on the browser's `WebSocket`.
#[derive(Default)]
pub struct BrowserTransport {
    socket: Option<WebSocket>,
    inbound: Option<UnboundedReceiver<Inbound>>,
    callbacks: Option<Callbacks>,
}

impl BrowserTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn detach(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.set_onopen(None);
            socket.set_onmessage(None);
            socket.set_onerror(None);
            socket.set_onclose(None);
            let _ = socket.close();
        }
        self.inbound = None;
        self.callbacks = None;
    }
}

impl Drop for BrowserTransport {
    fn drop(&mut self) {
        self.detach();
    }
}

fn js_error(value: wasm_bindgen::JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

impl Transport for BrowserTransport {
    async fn open(&mut self, url: &str) -> Result<(), TransportError> {
        self.detach();
        let socket = WebSocket::new(url).map_err(|e| TransportError::Open(js_error(e)))?;

        let (tx, rx): (UnboundedSender<Inbound>, _) = unbounded();
        let (open_tx, open_rx) = oneshot::channel::<Result<(), String>>();
        let pending_open = Rc::new(RefCell::new(Some(open_tx)));

        let on_open = {
            let pending_open = pending_open.clone();
            Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                if let Some(open_tx) = pending_open.borrow_mut().take() {
                    let _ = open_tx.send(Ok(()));
                }
            })
        };
        let on_message = {
            let tx = tx.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
                if let Some(text) = event.data().as_string() {
                    let _ = tx.unbounded_send(Inbound::Text(text));
                }
            })
        };
        let on_error = {
            let tx = tx.clone();
            let pending_open = pending_open.clone();
            Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                match pending_open.borrow_mut().take() {
                    Some(open_tx) => {
                        let _ = open_tx.send(Err("connection failed".to_string()));
                    }
                    None => {
                        let _ = tx.unbounded_send(Inbound::Error("socket error".to_string()));
                    }
                }
            })
        };
        let on_close = {
            let pending_open = pending_open.clone();
            Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
                if let Some(open_tx) = pending_open.borrow_mut().take() {
                    let _ = open_tx.send(Err(format!("closed with code {}", event.code())));
                }
                let _ = tx.unbounded_send(Inbound::Closed);
            })
        };

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        self.socket = Some(socket);
        self.inbound = Some(rx);
        self.callbacks = Some(Callbacks {
            _on_open: on_open,
            _on_message: on_message,
            _on_error: on_error,
            _on_close: on_close,
        });

        match open_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => {
                self.detach();
                Err(TransportError::Open(reason))
            }
            Err(_) => {
                self.detach();
                Err(TransportError::Open("socket dropped while opening".to_string()))
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        socket
            .send_with_str(&text)
            .map_err(|e| TransportError::Send(js_error(e)))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        let inbound = self.inbound.as_mut()?;
        match inbound.next().await {
            Some(Inbound::Text(text)) => Some(Ok(text)),
            Some(Inbound::Error(reason)) => {
                self.detach();
                Some(Err(TransportError::Receive(reason)))
            }
            Some(Inbound::Closed) | None => {
                self.detach();
                None
            }
        }
    }

    async fn close(&mut self) {
        self.detach();
    }
}
