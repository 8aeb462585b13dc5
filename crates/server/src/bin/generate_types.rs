//! Run with: cargo run --package server --bin generate-types --features typescript

use std::fs;
use std::path::Path;

fn main() {
    println!("Generating TypeScript types...");

    let out_dir = Path::new("frontend/src/types/generated");

    if let Err(e) = fs::create_dir_all(out_dir) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    #[cfg(feature = "typescript")]
    {
        use ts_rs::TS;

        showrunner_core::CompetitionEvent::export_all_to(out_dir)
            .expect("Failed to export CompetitionEvent");
        showrunner_core::ProgramOrder::export_all_to(out_dir).expect("Failed to export ProgramOrder");
        showrunner_core::Performance::export_all_to(out_dir).expect("Failed to export Performance");
        showrunner_core::PerformanceStatus::export_all_to(out_dir)
            .expect("Failed to export PerformanceStatus");
        showrunner_core::StatusTransition::export_all_to(out_dir)
            .expect("Failed to export StatusTransition");
        showrunner_core::JudgePerformanceView::export_all_to(out_dir)
            .expect("Failed to export JudgePerformanceView");
        showrunner_core::Score::export_all_to(out_dir).expect("Failed to export Score");
        showrunner_core::ScoringStatus::export_all_to(out_dir)
            .expect("Failed to export ScoringStatus");
        showrunner_core::ScoreDeletionRecord::export_all_to(out_dir)
            .expect("Failed to export ScoreDeletionRecord");
        showrunner_core::RankingEntry::export_all_to(out_dir).expect("Failed to export RankingEntry");
        showrunner_core::JudgeAssignment::export_all_to(out_dir)
            .expect("Failed to export JudgeAssignment");
        showrunner_core::FeeQuote::export_all_to(out_dir).expect("Failed to export FeeQuote");
        showrunner_core::Role::export_all_to(out_dir).expect("Failed to export Role");

        events::EventEnvelope::export_all_to(out_dir).expect("Failed to export EventEnvelope");
        events::Event::export_all_to(out_dir).expect("Failed to export Event");

        websocket::ClientMessage::export_all_to(out_dir).expect("Failed to export ClientMessage");
        websocket::ServerMessage::export_all_to(out_dir).expect("Failed to export ServerMessage");
        websocket::MutationIntent::export_all_to(out_dir).expect("Failed to export MutationIntent");
        websocket::SubscriptionFilter::export_all_to(out_dir)
            .expect("Failed to export SubscriptionFilter");

        server::routes::ReorderRequest::export_all_to(out_dir)
            .expect("Failed to export ReorderRequest");
        server::routes::AssignNumberRequest::export_all_to(out_dir)
            .expect("Failed to export AssignNumberRequest");
        server::routes::SetStatusRequest::export_all_to(out_dir)
            .expect("Failed to export SetStatusRequest");
        server::routes::ResetResponse::export_all_to(out_dir)
            .expect("Failed to export ResetResponse");
        server::routes::SetCurrentRequest::export_all_to(out_dir)
            .expect("Failed to export SetCurrentRequest");
    }

    println!("TypeScript types generated in {}", out_dir.display());
}
