//! Live server: runs the layout on a blocking task and streams every frame.

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info};

use crate::{
    map::{GridMap, MapFrame},
    observer::{LiveFrame, Observer, SnapEvent, TickEvent},
    scheduler::RealTime,
};

/// Observer fanning frames out to the HTTP handlers.
#[derive(Clone)]
pub struct FramePublisher {
    broadcaster: broadcast::Sender<String>,
    latest: Arc<Mutex<Option<LiveFrame>>>,
    frames: Arc<Mutex<Vec<LiveFrame>>>,
}

impl FramePublisher {
    pub fn new(capacity: usize) -> Self {
        let (broadcaster, _) = broadcast::channel(capacity);
        Self {
            broadcaster,
            latest: Arc::new(Mutex::new(None)),
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcaster.subscribe()
    }

    pub fn latest(&self) -> Option<LiveFrame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn frames(&self) -> Vec<LiveFrame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publish(&self, frame: LiveFrame) {
        if let Ok(payload) = serde_json::to_string(&frame) {
            // No subscribers is fine.
            let _ = self.broadcaster.send(payload);
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.clone());
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }
}

impl Observer for FramePublisher {
    fn on_tick(&mut self, event: &TickEvent<'_>) {
        self.publish(LiveFrame::from_tick(event));
    }

    fn on_snap_frame(&mut self, event: &SnapEvent<'_>) {
        self.publish(LiveFrame::from_snap(event));
    }
}

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub name: String,
    pub completed: bool,
    pub frame: Option<LiveFrame>,
    pub map: Option<MapFrame>,
}

#[derive(Serialize)]
struct FramesResponse {
    name: String,
    completed: bool,
    frames: Vec<LiveFrame>,
}

struct AppState {
    name: String,
    publisher: FramePublisher,
    final_map: Arc<Mutex<Option<MapFrame>>>,
    layout_done: Arc<AtomicBool>,
}

pub struct WebServerConfig {
    pub name: String,
    pub map: GridMap,
    pub frame_interval: Duration,
    /// Stop relaxing after this many ticks even if not converged.
    pub max_ticks: Option<u64>,
    pub host: String,
    pub port: u16,
}

/// The blocking half of the server: relaxes and snaps the map in real time,
/// publishing every frame. Both phases end early once `stop` is set.
struct LayoutTask {
    name: String,
    map: GridMap,
    frame_interval: Duration,
    max_ticks: Option<u64>,
    stop: Arc<AtomicBool>,
    publisher: FramePublisher,
    final_map: Arc<Mutex<Option<MapFrame>>>,
    done: Arc<AtomicBool>,
}

impl LayoutTask {
    fn run(mut self) -> Result<()> {
        let mut relax = RealTime::new(self.frame_interval).with_stop(self.stop.clone());
        if let Some(limit) = self.max_ticks {
            relax = relax.with_limit(limit);
        }
        let snap_interval = Duration::from_millis(self.map.config().snap.frame_ms);
        let mut snap = RealTime::new(snap_interval).with_stop(self.stop.clone());

        let outcome = self.map.layout(&mut relax, &mut snap, &mut self.publisher)?;
        *self
            .final_map
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(self.map.frame(&self.name));
        self.done.store(true, Ordering::SeqCst);
        info!(
            steps = outcome.run.steps,
            converged = outcome.run.converged,
            stopped = self.stop.load(Ordering::SeqCst),
            "layout finished"
        );
        Ok(())
    }
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        name,
        map,
        frame_interval,
        max_ticks,
        host,
        port,
    } = config;

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let publisher = FramePublisher::new(512);
    let final_map: Arc<Mutex<Option<MapFrame>>> = Arc::new(Mutex::new(None));
    let layout_done = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));

    let task = LayoutTask {
        name: name.clone(),
        map,
        frame_interval,
        max_ticks,
        stop: stop.clone(),
        publisher: publisher.clone(),
        final_map: final_map.clone(),
        done: layout_done.clone(),
    };
    let layout_handle = tokio::task::spawn_blocking(move || task.run());

    let state = Arc::new(AppState {
        name,
        publisher,
        final_map,
        layout_done,
    });

    let router = Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/frames", get(all_frames))
        .route("/api/events", get(stream_events))
        .with_state(state);

    info!(%addr, "live layout server listening (Ctrl+C to stop)");

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    stop.store(true, Ordering::SeqCst);
    match layout_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "layout failed"),
        Err(err) => error!(error = %err, "layout task failed"),
    }
    served?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down live layout server");
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    let map = state
        .final_map
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Json(StateEnvelope {
        name: state.name.clone(),
        completed: state.layout_done.load(Ordering::SeqCst),
        frame: state.publisher.latest(),
        map,
    })
}

async fn all_frames(State(state): State<Arc<AppState>>) -> Json<FramesResponse> {
    Json(FramesResponse {
        name: state.name.clone(),
        completed: state.layout_done.load(Ordering::SeqCst),
        frames: state.publisher.frames(),
    })
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.publisher.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
