//! Local implementations for pagevoice: the static HTML document, the noise classifier,
//! page scanning, summarization (local and remote), query matching, and the reader
//! controller that ties them to audio.

pub mod audio;
pub mod classify;
pub mod command;
pub mod config;
pub mod controls;
pub mod document;
pub mod gateway;
pub mod offers;
pub mod openai_compat;
pub mod query;
pub mod scan;
pub mod session;
pub mod summarize;
pub mod textprep;

pub use audio::{AudioEvent, RecordingAudio};
pub use command::{Command, KeyPress};
pub use config::GatewayConfig;
pub use document::StaticDocument;
pub use gateway::{GatewayState, SummaryGateway};
pub use query::{match_query, QueryMatch};
pub use scan::{scan, ScanOptions, ScanReport};
pub use session::{DispatchOutcome, QueryOutcome, Reader, SpeakOutcome, VoiceOutcome};

/// Rendered-text width for the page-summary fallback.
pub const PAGE_TEXT_WIDTH: usize = 100;

/// Load a finished scan into `reader`. The whole-page text is only kept when the scan
/// found no sections.
pub fn load_scan(reader: &Reader, doc: &StaticDocument, report: &ScanReport) {
    let page_text = if report.no_sections() {
        doc.page_text(PAGE_TEXT_WIDTH)
    } else {
        String::new()
    };
    reader.load_sections(report.sections.clone(), page_text);
}

/// Scan `html` and load the result into a fresh reader.
pub fn reader_for_html(
    html: &str,
    viewport: pagevoice_core::Viewport,
    opts: &ScanOptions,
    gateway: SummaryGateway,
    audio: std::sync::Arc<dyn pagevoice_core::AudioOut>,
) -> (Reader, ScanReport) {
    let mut doc = StaticDocument::parse(html, viewport);
    let report = scan(&mut doc, opts);
    let reader = Reader::new(gateway, audio);
    load_scan(&reader, &doc, &report);
    (reader, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagevoice_core::Viewport;
    use std::sync::Arc;

    #[tokio::test]
    async fn html_to_spoken_summary() {
        let html = r#"<html><body>
          <header><p>Site header with navigation links that should never be read aloud to anyone.</p></header>
          <article><h2>Harbor news</h2><span>The harbor reopened on Monday after two weeks of repairs to the northern pier and its lights.</span></article>
          <div class="promo-box"><span>Limited time offer on harbor tours for the whole family, book your seats today.</span></div>
        </body></html>"#;
        let audio = Arc::new(RecordingAudio::new());
        let (reader, report) = reader_for_html(
            html,
            Viewport::default(),
            &ScanOptions::default(),
            SummaryGateway::offline(),
            audio.clone(),
        );
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].heading_text, "Harbor news");

        let out = reader.dispatch("key:P".parse().unwrap()).await;
        let DispatchOutcome::Speak(SpeakOutcome::Spoken(text)) = out else {
            panic!("expected speech, got {out:?}");
        };
        assert!(text.contains("harbor reopened"));
        assert!(!text.contains("Limited time"));
        assert_eq!(audio.spoken(), vec![text]);
    }

    #[tokio::test]
    async fn empty_page_falls_back_to_page_text() {
        let html = "<html><body><h1>Closed today</h1><p>Back tomorrow morning.</p></body></html>";
        let audio = Arc::new(RecordingAudio::new());
        let (reader, report) = reader_for_html(
            html,
            Viewport::default(),
            &ScanOptions::default(),
            SummaryGateway::offline(),
            audio.clone(),
        );
        assert!(report.no_sections());
        let out = reader.page_summary(false).await;
        let SpeakOutcome::Spoken(text) = out else {
            panic!("expected speech, got {out:?}");
        };
        assert!(text.contains("Back tomorrow morning."));
    }
}
