use super::*;
use std::sync::Mutex;

/// Echoes a fixed answer and remembers what it was asked
struct RecordingGenerator {
    answer: String,
    prompts: Mutex<Vec<(String, GenerationOptions)>>,
}

impl RecordingGenerator {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl Generator for RecordingGenerator {
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<String, GenerationError> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .push((prompt.to_string(), *options));
        Ok(self.answer.clone())
    }
}

struct SlowGenerator(Duration);

impl Generator for SlowGenerator {
    fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> std::result::Result<String, GenerationError> {
        std::thread::sleep(self.0);
        Ok("too late".to_string())
    }
}

struct FailingGenerator(fn() -> GenerationError);

impl Generator for FailingGenerator {
    fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> std::result::Result<String, GenerationError> {
        Err((self.0)())
    }
}

#[test]
fn prompt_layout() {
    let prompt = build_prompt(
        "What color is the sky?",
        &["The sky is blue.", "Grass is green."],
    );

    assert_eq!(
        prompt,
        "Context:\nThe sky is blue.\nGrass is green.\n\nQuestion: What color is the sky?\nAnswer:"
    );
}

#[test]
fn prompt_with_no_context() {
    let prompt = build_prompt::<&str>("Why?", &[]);
    assert_eq!(prompt, "Context:\n\n\nQuestion: Why?\nAnswer:");
}

#[test]
fn default_options() {
    let options = GenerationOptions::default();
    assert_eq!(options.max_tokens, 512);
    assert!((options.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(GenerationConfig::default().timeout(), Duration::from_secs(120));
}

#[test]
fn config_validation() {
    assert!(GenerationConfig::default().validate().is_ok());

    let config = GenerationConfig {
        max_tokens: 0,
        ..GenerationConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidMaxTokens(0))
    ));

    let config = GenerationConfig {
        temperature: -0.1,
        ..GenerationConfig::default()
    };
    assert!(config.validate().is_err());

    let config = GenerationConfig {
        timeout_secs: 0,
        ..GenerationConfig::default()
    };
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn generate_passes_prompt_and_options() {
    let generator = Arc::new(RecordingGenerator::new("  Blue.\n"));
    let options = GenerationOptions {
        max_tokens: 64,
        temperature: 0.2,
    };

    let answer = generate_answer(
        Arc::clone(&generator) as Arc<dyn Generator>,
        "prompt text".to_string(),
        options,
        Duration::from_secs(5),
    )
    .await
    .expect("generation should succeed");

    assert_eq!(answer, "Blue.");
    let prompts = generator.prompts.lock().expect("lock should not be poisoned");
    assert_eq!(prompts.as_slice(), &[("prompt text".to_string(), options)]);
}

#[tokio::test]
async fn answer_uses_assembled_prompt() {
    let generator = Arc::new(RecordingGenerator::new("Blue."));

    let text = answer(
        "What color is the sky?",
        &["The sky is blue."],
        Arc::clone(&generator) as Arc<dyn Generator>,
        GenerationOptions::default(),
        Duration::from_secs(5),
    )
    .await
    .expect("generation should succeed");

    assert_eq!(text, "Blue.");
    let prompts = generator.prompts.lock().expect("lock should not be poisoned");
    assert_eq!(
        prompts[0].0,
        "Context:\nThe sky is blue.\n\nQuestion: What color is the sky?\nAnswer:"
    );
}

#[tokio::test]
async fn slow_generation_times_out() {
    let generator: Arc<dyn Generator> = Arc::new(SlowGenerator(Duration::from_millis(500)));

    let result = generate_answer(
        generator,
        "prompt".to_string(),
        GenerationOptions::default(),
        Duration::from_millis(50),
    )
    .await;

    assert!(matches!(
        result,
        Err(StudyMateError::GenerationTimeout(d)) if d == Duration::from_millis(50)
    ));
}

#[tokio::test]
async fn transport_timeout_is_reported_as_timeout() {
    let generator: Arc<dyn Generator> = Arc::new(FailingGenerator(|| GenerationError::TimedOut));

    let result = generate_answer(
        generator,
        "prompt".to_string(),
        GenerationOptions::default(),
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(result, Err(StudyMateError::GenerationTimeout(_))));
}

#[tokio::test]
async fn generation_failure_propagates() {
    let generator: Arc<dyn Generator> = Arc::new(FailingGenerator(|| {
        GenerationError::RequestFailed("boom".to_string())
    }));

    let result = generate_answer(
        generator,
        "prompt".to_string(),
        GenerationOptions::default(),
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(
        result,
        Err(StudyMateError::Generation(GenerationError::RequestFailed(_)))
    ));
}
