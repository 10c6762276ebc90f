use std::sync::Arc;

use rubric_core::{
    from_async_fn, similarity::from_fn, DirectoryDataSource, Evaluation, Evaluator, Generation,
    TestCase, TestDefinition, TrialRunner, VecDataSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Example 1: Inline definitions against a canned "model"
    let definitions = vec![
        TestDefinition::new(
            "capital-fr",
            TestCase::new("What is the capital of France?"),
            Evaluation::exact_match("Paris").with_variations(["paris", "PARIS"]),
        )
        .in_category("geography"),
        TestDefinition::new(
            "phone",
            TestCase::new("Give me a phone number."),
            Evaluation::regex_match(r"\d{3}-\d{4}"),
        )
        .in_category("format"),
        TestDefinition::new(
            "summary",
            TestCase::new("Summarize: the cat sat on the mat."),
            Evaluation::semantic_similarity("A cat was sitting on a mat."),
        )
        .in_category("language"),
    ];
    let data = Arc::new(VecDataSource::new(definitions));

    let backend = from_async_fn(|req| {
        let prompt = req.user_prompt.clone();
        async move {
            let text = if prompt.contains("France") {
                " paris "
            } else if prompt.contains("phone") {
                "Sure: call 555-1234 now."
            } else {
                "The cat sat on the mat."
            };
            Ok(Generation::text(text))
        }
    });

    // Stand-in similarity: share of reference words present in the candidate.
    let evaluator = Evaluator::new().with_similarity(from_fn(|candidate, reference| {
        let words: Vec<&str> = reference.split_whitespace().collect();
        let hits = words.iter().filter(|w| candidate.contains(*w)).count();
        Ok(hits as f64 / words.len().max(1) as f64)
    }));

    let runner = TrialRunner::builder()
        .data_source(data)
        .backend(backend.clone())
        .evaluator(evaluator)
        .model("canned")
        .concurrency(4)
        .build()?;

    let report = runner.run().await?;
    println!("{}", report.summary_table());

    // Example 2: Load a directory of JSON definitions if provided
    if let Some(path) = std::env::args().nth(1) {
        let runner = TrialRunner::builder()
            .data_source(Arc::new(DirectoryDataSource::new(path)))
            .backend(backend)
            .model("canned")
            .build()?;
        let report = runner.run().await?;
        println!("{}", report.summary_table());
    }

    Ok(())
}
