//! HTTP routes.
//!
//! - `/lhls/manifest.m3u8`: sliding live window over the playlist
//! - `/lhls/{segment}`: segments held until airtime and paced to their duration
//! - `/live/...`: the source playlist and files, untouched by the stream clock

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use lhls_engine::{MANIFEST_CONTENT_TYPE, SEGMENT_CONTENT_TYPE};
use tower_http::services::{ServeDir, ServeFile};

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/lhls/manifest.m3u8", get(lhls_manifest))
        .route("/lhls/{*segment}", get(lhls_segment));

    if let Some(source) = state.playlist.source_path() {
        router = router.route_service("/live/manifest.m3u8", ServeFile::new(source));
    }

    router
        .nest_service("/live", ServeDir::new(state.playlist.base_dir()))
        .fallback(not_found)
        .with_state(state)
}

/// Manifest exposing the segments that have "aired" so far.
async fn lhls_manifest(State(state): State<AppState>) -> ApiResult<Response> {
    let body = state.window.manifest(state.clock.as_ref())?;

    Ok((
        [
            (header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// Segment bytes, delayed until airtime and paced to the segment duration.
async fn lhls_segment(
    State(state): State<AppState>,
    Path(segment): Path<String>,
) -> ApiResult<Response> {
    let shaped = state.gate.open(&segment, state.clock.as_ref()).await?;
    let byte_size = shaped.byte_size();

    let mut response = Body::from_stream(shaped.into_stream()).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(SEGMENT_CONTENT_TYPE),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(byte_size));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::{Request, StatusCode};
    use lhls_engine::{LiveConfig, Playlist, StreamClock, TokioClock};
    use tokio::time::Instant;
    use tower::ServiceExt;

    use super::*;
    use crate::server::build_router;

    const SEGMENT_BYTES: usize = 2048;

    struct Fixture {
        dir: tempfile::TempDir,
        clock: Arc<TokioClock>,
        app: Router,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut text = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n");
        for i in 0..3 {
            text.push_str(&format!("#EXTINF:10.0,\nseg{i:03}.ts\n"));
            tokio::fs::write(
                dir.path().join(format!("seg{i:03}.ts")),
                vec![i as u8; SEGMENT_BYTES],
            )
            .await
            .unwrap();
        }
        text.push_str("#EXT-X-ENDLIST\n");
        let path = dir.path().join("vod.m3u8");
        tokio::fs::write(&path, &text).await.unwrap();

        let playlist = Arc::new(Playlist::load(&path).await.unwrap());
        let clock = Arc::new(TokioClock::new());
        let state = AppState::with_clock(playlist, LiveConfig::default(), clock.clone());

        Fixture {
            dir,
            clock,
            app: build_router(state),
        }
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::ORIGIN, "http://player.example.com")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test(start_paused = true)]
    async fn test_manifest_exposes_live_window() {
        let fx = fixture().await;

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/lhls/manifest.m3u8"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            MANIFEST_CONTENT_TYPE
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );

        let body = body_bytes(response).await;
        match m3u8_rs::parse_playlist_res(&body).unwrap() {
            m3u8_rs::Playlist::MediaPlaylist(pl) => {
                assert_eq!(pl.media_sequence, 0);
                let uris: Vec<_> = pl.segments.iter().map(|s| s.uri.as_str()).collect();
                assert_eq!(uris, vec!["seg000.ts", "seg001.ts"]);
                assert!(!pl.end_list);
            }
            m3u8_rs::Playlist::MasterPlaylist(_) => panic!("expected media playlist"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_manifest_loops_after_program_end() {
        let fx = fixture().await;
        tokio::time::advance(Duration::from_secs(31)).await;

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/lhls/manifest.m3u8"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fx.clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_segment_is_served_case_insensitively() {
        let fx = fixture().await;

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/lhls/SEG000.TS"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            SEGMENT_CONTENT_TYPE
        );
        assert_eq!(
            response.headers().get(header::CONTENT_LENGTH).unwrap(),
            &SEGMENT_BYTES.to_string()
        );

        let body = body_bytes(response).await;
        assert_eq!(body, vec![0u8; SEGMENT_BYTES]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_future_segment_waits_for_airtime() {
        let fx = fixture().await;
        let started = Instant::now();

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/lhls/seg002.ts"))
            .await
            .unwrap();
        let waited = started.elapsed().as_secs_f64();
        assert_eq!(response.status(), StatusCode::OK);
        assert!((20.0..20.5).contains(&waited), "waited {waited}s");

        let body = body_bytes(response).await;
        assert_eq!(body.len(), SEGMENT_BYTES);
        let total = started.elapsed().as_secs_f64();
        assert!((29.0..=31.0).contains(&total), "finished after {total}s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_manifest_served_while_segment_waits() {
        let fx = fixture().await;
        let started = Instant::now();

        let segment = tokio::spawn(fx.app.clone().oneshot(get_request("/lhls/seg002.ts")));
        tokio::task::yield_now().await;

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/lhls/manifest.m3u8"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!segment.is_finished());

        let response = segment.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let waited = started.elapsed().as_secs_f64();
        assert!(waited >= 20.0, "segment released after {waited}s");
    }

    #[tokio::test]
    async fn test_unknown_segment_is_404() {
        let fx = fixture().await;

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/lhls/seg999.ts"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_missing_segment_file_is_404() {
        let fx = fixture().await;
        tokio::fs::remove_file(fx.dir.path().join("seg001.ts"))
            .await
            .unwrap();

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/lhls/seg001.ts"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_path_is_verbatim_and_ignores_clock() {
        let fx = fixture().await;
        let start = fx.clock.stream_start();
        tokio::time::advance(Duration::from_secs(45)).await;

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/live/manifest.m3u8"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.contains("#EXT-X-ENDLIST"));
        assert!(body.contains("seg002.ts"));

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/live/seg002.ts"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, vec![2u8; SEGMENT_BYTES]);

        assert_eq!(fx.clock.stream_start(), start);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let fx = fixture().await;

        let response = fx
            .app
            .clone()
            .oneshot(get_request("/nothing/here"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let fx = fixture().await;

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/lhls/manifest.m3u8")
            .header(header::ORIGIN, "http://player.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = fx.app.clone().oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
