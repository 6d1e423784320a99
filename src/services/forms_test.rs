use super::*;
use crate::services::survey_form::{FormError, FormPhase, SubmitError};
use crate::state::test_helpers::{self, MemoryStore};
use crate::survey::{Question, Role};
use time::OffsetDateTime;

#[tokio::test]
async fn open_creates_and_activates_form() {
    let memory = Arc::new(MemoryStore::default());
    let store: Arc<dyn SurveyStore> = memory.clone();
    let registry = FormRegistry::default();
    let profile = test_helpers::profile(Role::Student);

    let form = registry.open(&store, &profile).await;

    assert_eq!(form.lock().await.phase(), FormPhase::Open);
    assert_eq!(registry.len().await, 1);
    assert_eq!(*memory.lookups.lock().unwrap(), 1);
}

#[tokio::test]
async fn open_reuses_existing_form() {
    let memory = Arc::new(MemoryStore::default());
    let store: Arc<dyn SurveyStore> = memory.clone();
    let registry = FormRegistry::default();
    let profile = test_helpers::profile(Role::Staff);

    let first = registry.open(&store, &profile).await;
    first.lock().await.set_rating(Question::Facilities, 4).unwrap();

    let second = registry.open(&store, &profile).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert!(second.lock().await.ratings().get(Question::Facilities).is_some());
    assert_eq!(*memory.lookups.lock().unwrap(), 1);
}

#[tokio::test]
async fn forms_are_per_identity() {
    let store: Arc<dyn SurveyStore> = Arc::new(MemoryStore::default());
    let registry = FormRegistry::default();

    let a = registry.open(&store, &test_helpers::profile(Role::Student)).await;
    let b = registry.open(&store, &test_helpers::profile(Role::Student)).await;

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn close_drops_form() {
    let store: Arc<dyn SurveyStore> = Arc::new(MemoryStore::default());
    let registry = FormRegistry::default();
    let profile = test_helpers::profile(Role::Lecturer);

    registry.open(&store, &profile).await;
    assert!(registry.close(profile.id).await);
    assert!(!registry.close(profile.id).await);
    assert_eq!(registry.len().await, 0);
}

#[tokio::test]
async fn open_drops_form_that_already_has_a_response() {
    let profile = test_helpers::profile(Role::Staff);
    let row = test_helpers::response_row(profile.id, Role::Staff, 3, "", OffsetDateTime::now_utc());
    let memory = Arc::new(MemoryStore::with_rows(vec![row]));
    let store: Arc<dyn SurveyStore> = memory.clone();
    let registry = FormRegistry::default();

    let form = registry.open(&store, &profile).await;
    assert_eq!(form.lock().await.phase(), FormPhase::AlreadySubmitted);
    assert_eq!(registry.len().await, 0);

    registry.open(&store, &profile).await;
    assert_eq!(*memory.lookups.lock().unwrap(), 2);
}

#[tokio::test]
async fn submit_success_drops_form() {
    let memory = Arc::new(MemoryStore::default());
    let store: Arc<dyn SurveyStore> = memory.clone();
    let registry = FormRegistry::default();
    let profile = test_helpers::profile(Role::Student);

    let form = registry.open(&store, &profile).await;
    for question in Question::ALL {
        form.lock().await.set_rating(question, 4).unwrap();
    }

    let view = registry.submit(profile.id, &form).await.unwrap();
    assert_eq!(view.phase, FormPhase::Submitted);
    assert_eq!(memory.insert_count(), 1);
    assert_eq!(registry.len().await, 0);
}

#[tokio::test]
async fn submit_failure_keeps_form_open() {
    let memory = Arc::new(MemoryStore::default());
    let store: Arc<dyn SurveyStore> = memory.clone();
    let registry = FormRegistry::default();
    let profile = test_helpers::profile(Role::Lecturer);

    let form = registry.open(&store, &profile).await;
    let failure = registry.submit(profile.id, &form).await.unwrap_err();
    assert!(matches!(failure.error, SubmitError::Incomplete(_)));
    assert_eq!(failure.view.phase, FormPhase::Open);

    for question in Question::ALL {
        form.lock().await.set_rating(question, 2).unwrap();
    }
    memory.fail_inserts_with(500, "insert failed");
    let failure = registry.submit(profile.id, &form).await.unwrap_err();
    assert_eq!(failure.error, SubmitError::Write("insert failed".into()));
    assert!(!failure.view.submitting);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn submit_while_in_flight_is_refused() {
    let store: Arc<dyn SurveyStore> = Arc::new(MemoryStore::default());
    let registry = FormRegistry::default();
    let profile = test_helpers::profile(Role::Student);

    let form = registry.open(&store, &profile).await;
    for question in Question::ALL {
        form.lock().await.set_rating(question, 5).unwrap();
    }
    form.lock().await.begin_submit().unwrap();

    let failure = registry.submit(profile.id, &form).await.unwrap_err();
    assert_eq!(failure.error, SubmitError::Refused(FormError::InFlight));
    assert!(failure.view.submitting);
}
