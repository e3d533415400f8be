mod helpers;

use helpers::{ScriptedModel, PHOTO};
use kitchen_memories::generation::prompts::{PLACEHOLDER_DESCRIPTION, PLACEHOLDER_MEMORY};
use kitchen_memories::generation::{
    AnalysisTier, GenerationError, InlineImage, MatchCandidate, MatchOutcome, MemoryGenerator,
};
use std::sync::Arc;

fn candidates() -> Vec<MatchCandidate> {
    vec![
        MatchCandidate {
            id: "mug-1".into(),
            description: "A white mug with a hairline crack near the handle".into(),
        },
        MatchCandidate {
            id: "pan-2".into(),
            description: "A 10-inch cast iron skillet with a rough patch".into(),
        },
    ]
}

fn match_reply(id: Option<&str>, confidence: u32) -> String {
    serde_json::json!({"matchedId": id, "confidence": confidence, "reasoning": "crack matches"})
        .to_string()
}

#[tokio::test]
async fn no_candidates_means_no_request() {
    let model = Arc::new(ScriptedModel::new());
    let generator = MemoryGenerator::new(model.clone());

    let outcome = generator
        .find_matching_description("A white mug", &[])
        .await
        .unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch);
    assert_eq!(model.total_calls(), 0);
}

#[tokio::test]
async fn confidence_below_threshold_is_no_match() {
    let model = Arc::new(ScriptedModel::new().with_replies([match_reply(Some("mug-1"), 65)]));
    let generator = MemoryGenerator::new(model.clone());

    let outcome = generator
        .find_matching_description("A white mug with a crack", &candidates())
        .await
        .unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch);
    assert_eq!(model.text_calls(), 1);
}

#[tokio::test]
async fn confidence_at_threshold_matches() {
    let model = Arc::new(ScriptedModel::new().with_replies([match_reply(Some("mug-1"), 70)]));
    let generator = MemoryGenerator::new(model);

    let outcome = generator
        .find_matching_description("A white mug with a crack", &candidates())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MatchOutcome::Matched {
            id: "mug-1".into(),
            confidence: 70.0,
            reasoning: Some("crack matches".into()),
        }
    );
}

#[tokio::test]
async fn threshold_is_configurable() {
    let model = Arc::new(ScriptedModel::new().with_replies([match_reply(Some("pan-2"), 80)]));
    let generator = MemoryGenerator::with_threshold(model, 90.0);
    assert_eq!(generator.match_threshold(), 90.0);

    let outcome = generator
        .find_matching_description("A skillet", &candidates())
        .await
        .unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch);
}

#[tokio::test]
async fn unusable_match_replies_are_no_match() {
    let replies = [
        match_reply(None, 95),
        match_reply(Some("somebody-else"), 99),
        "I think it is the mug!".to_string(),
        String::new(),
    ];
    for reply in replies {
        let model = Arc::new(ScriptedModel::new().with_replies([reply.clone()]));
        let generator = MemoryGenerator::new(model);
        let outcome = generator
            .find_matching_description("A white mug", &candidates())
            .await
            .unwrap();
        assert_eq!(outcome, MatchOutcome::NoMatch, "reply: {reply}");
    }
}

#[tokio::test]
async fn match_reply_wrapped_in_prose_is_recovered() {
    let reply = format!("Sure! Here you go: {} Hope that helps.", match_reply(Some("pan-2"), 88));
    let model = Arc::new(ScriptedModel::new().with_replies([reply]));
    let generator = MemoryGenerator::new(model);

    let outcome = generator
        .find_matching_description("A cast iron skillet", &candidates())
        .await
        .unwrap();
    assert!(matches!(outcome, MatchOutcome::Matched { ref id, .. } if id == "pan-2"));
}

#[tokio::test]
async fn analysis_degrades_instead_of_failing() {
    let image = InlineImage::parse(PHOTO).unwrap();
    let cases = [
        (
            r#"{"description": "A glass measuring cup", "memory": "Baking with Mom."}"#,
            AnalysisTier::Json,
            "A glass measuring cup",
            "Baking with Mom.",
        ),
        (
            r#"The answer: "description": "A glass measuring cup", "memory": "Baking"#,
            AnalysisTier::Fields,
            "A glass measuring cup",
            PLACEHOLDER_MEMORY,
        ),
        (
            "Lovely photo!",
            AnalysisTier::Placeholder,
            PLACEHOLDER_DESCRIPTION,
            PLACEHOLDER_MEMORY,
        ),
    ];

    for (reply, tier, description, memory) in cases {
        let model = Arc::new(ScriptedModel::new().with_replies([reply]));
        let generator = MemoryGenerator::new(model.clone());
        let analysis = generator.analyze_user_image(&image).await.unwrap();

        assert_eq!(analysis.tier, tier, "reply: {reply}");
        assert_eq!(analysis.description, description);
        assert_eq!(analysis.memory, memory);
        assert_eq!(model.text_calls(), 1);
    }
}

#[tokio::test]
async fn analysis_surfaces_transport_failure() {
    let image = InlineImage::parse(PHOTO).unwrap();
    let generator = MemoryGenerator::new(Arc::new(ScriptedModel::new().failing_text()));

    let err = generator.analyze_user_image(&image).await.unwrap_err();
    assert!(matches!(err, GenerationError::Api { status: 503, .. }));
}

#[tokio::test]
async fn matching_description_must_not_be_empty() {
    let image = InlineImage::parse(PHOTO).unwrap();
    let generator = MemoryGenerator::new(Arc::new(ScriptedModel::new().with_replies(["   "])));

    let err = generator.describe_image_for_matching(&image).await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyResponse));
}

#[tokio::test]
async fn random_object_runs_three_requests() {
    let model = Arc::new(ScriptedModel::new().with_replies([
        "  The whisk that made every birthday cake.  ",
        "A balloon whisk with a bent wire.",
    ]));
    let generator = MemoryGenerator::new(model.clone());

    let generated = generator.generate_object_memory("whisk").await.unwrap();
    assert_eq!(generated.object, "whisk");
    assert_eq!(generated.object_memory, "The whisk that made every birthday cake.");
    assert_eq!(generated.object_description, "A balloon whisk with a bent wire.");
    assert_eq!(generated.object_image_base64, helpers::ILLUSTRATION);
    assert_eq!(model.text_calls(), 2);
    assert_eq!(model.image_calls(), 1);
    assert!(model.prompts().iter().all(|p| p.contains("whisk")));
}

#[tokio::test]
async fn random_object_fails_when_any_request_fails() {
    let model = Arc::new(ScriptedModel::new().without_image());
    let generator = MemoryGenerator::new(model.clone());

    let err = generator.generate_random_object_memory().await.unwrap_err();
    assert!(matches!(err, GenerationError::MissingImage));
    // The description request depends on the image and is never sent.
    assert!(model.text_calls() <= 1);
}

#[tokio::test]
async fn random_object_rejects_empty_narrative() {
    let model = Arc::new(ScriptedModel::new().with_replies(["", "A balloon whisk."]));
    let generator = MemoryGenerator::new(model);

    let err = generator.generate_object_memory("whisk").await.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyResponse));
}
