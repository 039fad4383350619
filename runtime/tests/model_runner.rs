mod common;

use std::sync::Arc;

use common::{ScriptedModel, chunk_reply, long_text, runner, title_reply};
use rfp_extract::{
    ai::{
        runner::{ChunkStatus, recover_json_object},
        schemas::CanonicalResult,
    },
    pipeline::{
        merge::{TOTAL_FAILURE_SUMMARY, merge},
        normalize::normalize,
    },
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn normalized(reply: &Result<String, String>) -> CanonicalResult {
    let raw = reply.as_ref().expect("scripted reply");
    normalize(&Value::Object(recover_json_object(raw, 0))).result
}

#[tokio::test]
async fn failed_middle_chunk_is_skipped_and_others_merge_in_order() {
    let first = title_reply("Harbour Dredging RFP", "Provide dredging plan");
    let third = chunk_reply(json!({
        "rfp_title": "A later title",
        "issuing_organization": "Port Authority",
        "requirements_checklist": {
            "technical": [
                {"requirement": "provide dredging plan", "strength": "mandatory"},
                {"requirement": "Supply survey vessel", "strength": "preferred"}
            ]
        }
    }));
    let expected = merge(
        merge(CanonicalResult::default(), normalized(&first)),
        normalized(&third),
    );

    let model = Arc::new(ScriptedModel::new([
        first,
        Ok("I could not find anything useful here.".to_string()),
        third,
    ]));
    let run = runner(model.clone()).run(&long_text(25_000), None, None).await;

    assert_eq!(run.meta.chunk_count, 3);
    assert_eq!(run.meta.chunk_lengths, vec![12_000, 12_000, 5_000]);
    assert_eq!(run.meta.failures, 1);
    assert_eq!(run.result, expected);
    assert_eq!(run.result.rfp_title, "Harbour Dredging RFP");
    assert_eq!(run.result.issuing_organization, "Port Authority");
    assert_eq!(run.result.requirements_checklist.technical.len(), 2);
    assert_eq!(
        run.chunks.iter().map(|chunk| chunk.status).collect::<Vec<_>>(),
        vec![ChunkStatus::Parsed, ChunkStatus::Failed, ChunkStatus::Parsed]
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1].messages[1].content.contains("part 2 of 3"));
}

#[tokio::test]
async fn every_chunk_failing_yields_the_sentinel() {
    let model = Arc::new(ScriptedModel::new([
        Err("connection refused".to_string()),
        Ok("```json\n{\"rfp_title\": \n```".to_string()),
        Ok("{}".to_string()),
    ]));
    let run = runner(model).run(&long_text(25_000), None, None).await;

    assert_eq!(run.meta.failures, 3);
    assert_eq!(run.result.summary_paragraph, TOTAL_FAILURE_SUMMARY);
    assert!(run.result.rfp_title.is_empty());
    assert!(run.result.requirements_checklist.is_empty());
    assert!(run.chunks[0].raw.is_none());
}

#[tokio::test]
async fn short_text_is_sent_as_a_single_chunk_with_context() {
    let model = Arc::new(ScriptedModel::new([title_reply("Short RFP", "Bring a CV")]));
    let run = runner(model.clone())
        .run(
            "Short RFP. Bring a CV.",
            Some("Context:\n- File: short.txt\n- Mode: fast_path"),
            None,
        )
        .await;

    assert_eq!(run.meta.chunk_count, 1);
    assert_eq!(run.meta.failures, 0);
    let user = &model.requests()[0].messages[1].content;
    assert!(user.contains("- File: short.txt\n- Mode: fast_path\n----\nShort RFP. Bring a CV."));
}

#[tokio::test]
async fn unknown_model_falls_back_to_default() {
    let model = Arc::new(ScriptedModel::new([title_reply("X", "Y requirement")]));
    let run = runner(model.clone())
        .run("some text", None, Some("gpt-unknown"))
        .await;

    assert_eq!(run.meta.model, "qwen2.5-vl-7b-instruct");
    assert_eq!(model.requests()[0].model, "qwen2.5-vl-7b-instruct");
}

#[tokio::test]
async fn flat_shape_is_counted_as_unrecognized() {
    let model = Arc::new(ScriptedModel::new([chunk_reply(json!({
        "title": "Flat shape",
        "requirements": [{"requirement": "something"}]
    }))]));
    let run = runner(model).run("some text", None, None).await;

    assert_eq!(run.meta.unrecognized_chunks, 1);
    assert_eq!(run.meta.failures, 1);
    assert_eq!(run.result.summary_paragraph, TOTAL_FAILURE_SUMMARY);
}

#[tokio::test]
async fn cancellation_stops_at_the_next_chunk_boundary() {
    let token = CancellationToken::new();
    let model = Arc::new(
        ScriptedModel::new([
            title_reply("Cancelled RFP", "Deliver phase one"),
            title_reply("never sent", "never sent either"),
            title_reply("never sent", "never sent either"),
        ])
        .cancelling_after(1, token.clone()),
    );
    let run = runner(model.clone())
        .run_until_cancelled(&long_text(25_000), None, None, &token)
        .await;

    assert_eq!(model.requests().len(), 1);
    assert!(run.meta.cancelled);
    assert_eq!(run.meta.failures, 0);
    assert_eq!(run.result.rfp_title, "Cancelled RFP");
    assert_eq!(
        run.chunks.iter().map(|chunk| chunk.status).collect::<Vec<_>>(),
        vec![ChunkStatus::Parsed, ChunkStatus::Skipped, ChunkStatus::Skipped]
    );
}
