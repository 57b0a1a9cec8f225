//! services/api/src/grpc.rs
//!
//! The gRPC transport for the read-only content operations defined in
//! proto/content.proto. Every call goes through the same `ContentService`
//! as the REST handlers, so both transports share one cache.

use std::sync::Arc;

use scripture_core::domain::{Chapter, Verse};
use scripture_core::ports::PortError;
use scripture_core::ContentService;
use tonic::{Request, Response, Status};
use tracing::error;

// Include the generated protobuf code
pub mod proto {
    tonic::include_proto!("content.v1");
}

use proto::content_service_server::{ContentService as ContentRpc, ContentServiceServer};

// ============================================================================
// CONVERSION HELPERS
// ============================================================================

fn port_status(err: PortError) -> Status {
    match err {
        PortError::NotFound(m) => Status::not_found(m),
        PortError::BadInput(m) => Status::invalid_argument(m),
        PortError::Conflict(m) => Status::already_exists(m),
        PortError::Unexpected(m) => {
            error!("gRPC call failed: {}", m);
            Status::internal("An internal error occurred")
        }
    }
}

fn chapter_to_proto(chapter: &Chapter) -> proto::Chapter {
    proto::Chapter {
        id: chapter.id,
        number: chapter.number,
        name: chapter.name.clone(),
        latin_name: chapter.latin_name.clone(),
        english_name: chapter.english_name.clone(),
        localized_name: chapter.localized_name.clone(),
        revelation_type: chapter.revelation_type.clone(),
        verse_count: chapter.verse_count,
    }
}

fn verse_to_proto(verse: &Verse) -> proto::Verse {
    proto::Verse {
        number: verse.number,
        text_original: verse.text_original.clone(),
        text_transliteration: verse.text_transliteration.clone(),
        translation: verse.translation.clone(),
    }
}

// ============================================================================
// CONTENT SERVICE
// ============================================================================

#[derive(Clone)]
pub struct ContentGrpcService {
    content: Arc<ContentService>,
}

impl ContentGrpcService {
    pub fn new(content: Arc<ContentService>) -> Self {
        Self { content }
    }

    pub fn into_server(self) -> ContentServiceServer<Self> {
        ContentServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl ContentRpc for ContentGrpcService {
    async fn list_chapters(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<proto::ChapterListResponse>, Status> {
        let chapters = self
            .content
            .get_all_chapters()
            .await
            .map_err(port_status)?;

        Ok(Response::new(proto::ChapterListResponse {
            chapters: chapters.iter().map(chapter_to_proto).collect(),
        }))
    }

    async fn get_chapter(
        &self,
        request: Request<proto::ChapterRequest>,
    ) -> Result<Response<proto::ChapterDetailResponse>, Status> {
        let number = request.into_inner().number;
        let chapter = self
            .content
            .get_chapter_detail(number)
            .await
            .map_err(port_status)?;

        Ok(Response::new(proto::ChapterDetailResponse {
            chapter: Some(chapter_to_proto(&chapter)),
            verses: chapter.verses.iter().map(verse_to_proto).collect(),
        }))
    }

    async fn get_verse(
        &self,
        request: Request<proto::VerseRequest>,
    ) -> Result<Response<proto::VerseResponse>, Status> {
        let req = request.into_inner();
        let verse = self
            .content
            .get_verse_detail(req.chapter_number, req.verse_number)
            .await
            .map_err(port_status)?;

        Ok(Response::new(proto::VerseResponse {
            chapter_number: req.chapter_number,
            verse: Some(verse_to_proto(&verse)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripture_core::testing::{InMemoryCache, InMemoryContent};
    use scripture_core::ContentPolicy;
    use tonic::Code;

    fn service() -> (ContentGrpcService, Arc<InMemoryContent>) {
        let store = Arc::new(InMemoryContent::with_sample_data());
        let content = ContentService::new(
            store.clone(),
            Arc::new(InMemoryCache::new()),
            ContentPolicy::default(),
        );
        (ContentGrpcService::new(Arc::new(content)), store)
    }

    #[tokio::test]
    async fn lists_chapter_summaries() {
        let (svc, _) = service();
        let response = svc
            .list_chapters(Request::new(proto::Empty {}))
            .await
            .unwrap()
            .into_inner();

        let numbers: Vec<i32> = response.chapters.iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(response.chapters[0].latin_name, "Al-Fatihah");
    }

    #[tokio::test]
    async fn chapter_detail_carries_its_verses() {
        let (svc, _) = service();
        let response = svc
            .get_chapter(Request::new(proto::ChapterRequest { number: 2 }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.chapter.unwrap().english_name, "The Cow");
        assert_eq!(response.verses.len(), 2);
        assert_eq!(response.verses[0].text_transliteration, "alif lam mim");
    }

    #[tokio::test]
    async fn repeated_calls_are_served_from_the_cache() {
        let (svc, store) = service();
        for _ in 0..3 {
            svc.get_chapter(Request::new(proto::ChapterRequest { number: 1 }))
                .await
                .unwrap();
        }
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn unknown_chapter_is_not_found() {
        let (svc, _) = service();
        let status = svc
            .get_chapter(Request::new(proto::ChapterRequest { number: 115 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn verse_is_scoped_to_its_chapter() {
        let (svc, _) = service();
        let response = svc
            .get_verse(Request::new(proto::VerseRequest {
                chapter_number: 3,
                verse_number: 1,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.chapter_number, 3);
        assert_eq!(response.verse.unwrap().text_transliteration, "alif lam mim allahu");

        let status = svc
            .get_verse(Request::new(proto::VerseRequest {
                chapter_number: 3,
                verse_number: 2,
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn store_failures_hide_their_details() {
        let (svc, store) = service();
        store.set_failing(true);
        let status = svc
            .list_chapters(Request::new(proto::Empty {}))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "An internal error occurred");
    }
}
