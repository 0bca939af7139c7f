use super::*;

struct FixedClassifier(Result<bool, String>);

#[async_trait]
impl TriageClassifier for FixedClassifier {
    async fn classify(&self, _title: &str, _body: &str) -> Result<bool, TriageError> {
        self.0.clone().map_err(TriageError::Classifier)
    }
}

#[tokio::test]
async fn returns_the_classifier_verdict() {
    let classifier = FixedClassifier(Ok(true));
    assert_eq!(run(&classifier, "t", "b").await, Some(true));
}

#[tokio::test]
async fn classifier_error_yields_none_rather_than_panicking() {
    let classifier = FixedClassifier(Err("down".to_string()));
    assert_eq!(run(&classifier, "t", "b").await, None);
}
