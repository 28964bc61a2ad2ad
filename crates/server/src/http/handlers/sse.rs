use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use domain::PostId;
use futures::stream::Stream;
use tokio_stream::StreamExt;

use crate::error::ServiceError;
use crate::state::AppState;

pub async fn stream_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ServiceError> {
    let post_id = PostId::new(post_id).map_err(ServiceError::InvalidId)?;
    let session = state.comments.open_stream(post_id).await?;

    // the session unsubscribes when axum drops this stream
    let stream = session.into_stream().map(|event| {
        Event::default().json_data(event.as_ref()).map_err(|e| {
            tracing::error!("SSE serialization error: {}", e);
            axum::Error::new(e)
        })
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}
