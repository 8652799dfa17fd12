use crate::config::TransportConfig;
use crate::engine::{
    MediaEngine, MediaSession, RemoteTrackInfo, SessionEvent, SignalingState, TrackKind,
};
use crate::error::EngineError;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use roomlink_core::{IceCandidate, PeerId, SdpKind, SessionDescription};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine as CodecRegistry};
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Captured local tracks. Every session created by the engine sends all of them.
#[derive(Clone, Default)]
pub struct LocalMedia {
    tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) -> Self {
        Self { tracks }
    }

    /// One Opus audio track and one VP8 video track in the same stream.
    /// Samples are written by whoever owns the capture device.
    pub fn audio_video(
        stream_id: &str,
    ) -> (
        Self,
        Arc<TrackLocalStaticSample>,
        Arc<TrackLocalStaticSample>,
    ) {
        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.to_owned(),
        ));
        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.to_owned(),
        ));

        let media = Self::new(vec![
            Arc::clone(&audio) as Arc<dyn TrackLocal + Send + Sync>,
            Arc::clone(&video) as Arc<dyn TrackLocal + Send + Sync>,
        ]);
        (media, audio, video)
    }

    pub fn tracks(&self) -> &[Arc<dyn TrackLocal + Send + Sync>] {
        &self.tracks
    }
}

/// [`MediaEngine`] backed by webrtc-rs peer connections.
pub struct WebrtcEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    api: API,
    config: TransportConfig,
    local_media: LocalMedia,
}

impl WebrtcEngine {
    pub fn new(config: TransportConfig, local_media: LocalMedia) -> Result<Self> {
        let mut codecs = CodecRegistry::default();
        codecs.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut codecs)?;

        let api = APIBuilder::new()
            .with_media_engine(codecs)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            inner: Arc::new(EngineInner {
                api,
                config,
                local_media,
            }),
        })
    }
}

impl EngineInner {
    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = self
            .config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect();

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }

    /// Build a peer connection carrying the local tracks, wired to `events`.
    async fn connect(
        &self,
        peer: &PeerId,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Arc<RTCPeerConnection>> {
        let pc = Arc::new(
            self.api
                .new_peer_connection(self.rtc_configuration())
                .await
                .context("failed to create peer connection")?,
        );

        for track in self.local_media.tracks() {
            let sender = pc
                .add_track(Arc::clone(track))
                .await
                .context("failed to attach local track")?;

            // RTCP has to be drained for the interceptors to run.
            tokio::spawn(async move {
                let mut buf = vec![0u8; 1500];
                while sender.read(&mut buf).await.is_ok() {}
            });
        }

        let state_tx = events.clone();
        let peer_state = peer.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let peer = peer_state.clone();

            Box::pin(async move {
                info!("Peer connection state for {} changed: {}", peer, s);
                match s {
                    RTCPeerConnectionState::Failed
                    | RTCPeerConnectionState::Disconnected
                    | RTCPeerConnectionState::Closed => {
                        let _ = tx.send(SessionEvent::Disconnected(peer)).await;
                    }
                    _ => {}
                }
            })
        }));

        let ice_tx = events.clone();
        let peer_ice = peer.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let peer = peer_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(SessionEvent::CandidateGenerated(peer, from_rtc_candidate(init)))
                    .await;
            })
        }));

        let track_tx = events;
        let peer_track = peer.clone();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let peer = peer_track.clone();

                Box::pin(async move {
                    let info = RemoteTrackInfo {
                        track_id: track.id(),
                        stream_id: track.stream_id(),
                        kind: match track.kind() {
                            RTPCodecType::Audio => TrackKind::Audio,
                            RTPCodecType::Video => TrackKind::Video,
                            _ => TrackKind::Unknown,
                        },
                    };
                    debug!("Received {:?} track {} from {}", info.kind, info.track_id, peer);
                    let _ = tx.send(SessionEvent::RemoteTrack(peer, info)).await;

                    // Keep the receive pipeline moving; rendering is someone else's job.
                    tokio::spawn(async move { while track.read_rtp().await.is_ok() {} });
                })
            },
        ));

        Ok(pc)
    }
}

#[async_trait]
impl MediaEngine for WebrtcEngine {
    async fn create_session(
        &self,
        peer: &PeerId,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Box<dyn MediaSession>, EngineError> {
        let pc = self.inner.connect(peer, events.clone()).await?;
        Ok(Box::new(WebrtcSession {
            peer: peer.clone(),
            engine: Arc::clone(&self.inner),
            events,
            pc: RwLock::new(pc),
        }))
    }
}

pub struct WebrtcSession {
    peer: PeerId,
    engine: Arc<EngineInner>,
    events: mpsc::Sender<SessionEvent>,
    pc: RwLock<Arc<RTCPeerConnection>>,
}

impl WebrtcSession {
    fn pc(&self) -> Arc<RTCPeerConnection> {
        Arc::clone(&self.pc.read().unwrap_or_else(PoisonError::into_inner))
    }

    async fn offer(&self) -> Result<SessionDescription> {
        let offer = self
            .pc()
            .create_offer(None)
            .await
            .with_context(|| format!("create_offer toward {} failed", self.peer))?;
        from_rtc_description(offer)
    }

    async fn answer(&self) -> Result<SessionDescription> {
        let answer = self
            .pc()
            .create_answer(None)
            .await
            .with_context(|| format!("create_answer toward {} failed", self.peer))?;
        from_rtc_description(answer)
    }

    async fn apply_local(&self, desc: SessionDescription) -> Result<()> {
        self.pc()
            .set_local_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn apply_remote(&self, desc: SessionDescription) -> Result<()> {
        self.pc()
            .set_remote_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn roll_back(&self) -> Result<()> {
        let pc = self.pc();

        // webrtc-rs refuses a rollback with an empty body, so the pending
        // description's SDP is replayed under the rollback type.
        if let Some(pending) = pc.pending_local_description().await {
            match pc.set_local_description(rollback_of(pending.sdp)).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Local rollback toward {} failed: {}", self.peer, e),
            }
        } else if let Some(pending) = pc.pending_remote_description().await {
            // A first remote offer has already configured transceivers and
            // ICE, so only a renegotiation is rolled back in place.
            if pc.current_remote_description().await.is_some() {
                match pc.set_remote_description(rollback_of(pending.sdp)).await {
                    Ok(()) => return Ok(()),
                    Err(e) => warn!("Remote rollback toward {} failed: {}", self.peer, e),
                }
            }
        } else {
            bail!("nothing to roll back toward {}", self.peer);
        }

        info!("Replacing the connection toward {} to discard its pending offer", self.peer);
        self.replace_connection().await
    }

    async fn replace_connection(&self) -> Result<()> {
        let fresh = self.engine.connect(&self.peer, self.events.clone()).await?;
        let old = {
            let mut slot = self.pc.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, fresh)
        };

        old.on_ice_candidate(Box::new(|_| Box::pin(async {})));
        old.on_peer_connection_state_change(Box::new(|_| Box::pin(async {})));
        old.close()
            .await
            .context("failed to close replaced peer connection")?;
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.pc()
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .context("failed to add remote ICE candidate")?;
        Ok(())
    }
}

#[async_trait]
impl MediaSession for WebrtcSession {
    async fn create_offer(&self) -> Result<SessionDescription, EngineError> {
        Ok(self.offer().await?)
    }

    async fn create_answer(&self) -> Result<SessionDescription, EngineError> {
        Ok(self.answer().await?)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        Ok(self.apply_local(desc).await?)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), EngineError> {
        Ok(self.apply_remote(desc).await?)
    }

    async fn rollback(&self) -> Result<(), EngineError> {
        Ok(self.roll_back().await?)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), EngineError> {
        Ok(self.add_candidate(candidate).await?)
    }

    fn signaling_state(&self) -> SignalingState {
        match self.pc().signaling_state() {
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.pc()
            .close()
            .await
            .context("failed to close peer connection")?;
        Ok(())
    }
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Pranswer => SdpKind::Pranswer,
        RTCSdpType::Answer => SdpKind::Answer,
        RTCSdpType::Rollback => SdpKind::Rollback,
        other => bail!("engine produced a description of type {}", other),
    };
    Ok(SessionDescription {
        kind,
        sdp: desc.sdp,
    })
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpKind::Rollback => bail!("rollback is applied through MediaSession::rollback"),
    };
    Ok(rtc)
}

fn rollback_of(sdp: String) -> RTCSessionDescription {
    let mut rollback = RTCSessionDescription::default();
    rollback.sdp_type = RTCSdpType::Rollback;
    rollback.sdp = sdp;
    rollback
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}
