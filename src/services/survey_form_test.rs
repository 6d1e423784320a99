use super::*;
use crate::state::test_helpers::{self, MemoryStore};
use time::OffsetDateTime;

async fn open_form(store: &Arc<MemoryStore>, role: Role) -> SurveyForm {
    let mut form = SurveyForm::new(store.clone(), test_helpers::profile(role));
    form.activate().await;
    form
}

fn rate_all(form: &mut SurveyForm, value: u8) {
    for question in Question::ALL {
        form.set_rating(question, value).unwrap();
    }
}

// =============================================================================
// activate
// =============================================================================

#[tokio::test]
async fn new_form_is_checking_until_activated() {
    let store = Arc::new(MemoryStore::default());
    let form = SurveyForm::new(store, test_helpers::profile(Role::Student));
    assert_eq!(form.phase(), FormPhase::Checking);
    assert_eq!(form.existing_response_found(), None);
}

#[tokio::test]
async fn activate_without_prior_response_opens_form() {
    let store = Arc::new(MemoryStore::default());
    let form = open_form(&store, Role::Student).await;
    assert_eq!(form.phase(), FormPhase::Open);
    assert_eq!(form.existing_response_found(), Some(false));
}

#[tokio::test]
async fn activate_with_prior_response_never_opens_form() {
    let profile = test_helpers::profile(Role::Lecturer);
    let row = test_helpers::response_row(profile.id, Role::Lecturer, 4, "", OffsetDateTime::now_utc());
    let store = Arc::new(MemoryStore::with_rows(vec![row]));

    let mut form = SurveyForm::new(store.clone(), profile);
    form.activate().await;

    assert_eq!(form.phase(), FormPhase::AlreadySubmitted);
    assert_eq!(form.existing_response_found(), Some(true));
    assert_eq!(form.set_rating(Question::Facilities, 5), Err(FormError::Closed));
    assert_eq!(form.submit().await, Err(SubmitError::Refused(FormError::Closed)));
    assert_eq!(store.insert_count(), 0);
}

#[tokio::test]
async fn activate_failure_opens_form() {
    let store = Arc::new(MemoryStore::default());
    store.fail_reads_with(503, "service unavailable");
    let form = open_form(&store, Role::Staff).await;
    assert_eq!(form.phase(), FormPhase::Open);
    assert_eq!(form.last_error(), None);
}

#[tokio::test]
async fn activate_queries_store_once() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Student).await;
    form.activate().await;
    form.activate().await;
    assert_eq!(*store.lookups.lock().unwrap(), 1);
}

// =============================================================================
// input
// =============================================================================

#[tokio::test]
async fn input_refused_before_activation() {
    let store = Arc::new(MemoryStore::default());
    let mut form = SurveyForm::new(store.clone(), test_helpers::profile(Role::Student));
    assert_eq!(form.set_rating(Question::Facilities, 3), Err(FormError::NotReady));
    assert_eq!(form.set_comment("hi"), Err(FormError::NotReady));
    assert_eq!(form.begin_submit(), Err(SubmitError::Refused(FormError::NotReady)));
    assert_eq!(store.insert_count(), 0);
}

#[tokio::test]
async fn set_rating_rejects_out_of_range_values() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Student).await;
    assert_eq!(form.set_rating(Question::Facilities, 0), Err(FormError::InvalidRating(RatingOutOfRange(0))));
    assert_eq!(form.set_rating(Question::Facilities, 6), Err(FormError::InvalidRating(RatingOutOfRange(6))));
    assert_eq!(form.ratings().get(Question::Facilities), None);
}

#[tokio::test]
async fn set_rating_is_idempotent() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Student).await;
    form.set_rating(Question::TeachingQuality, 4).unwrap();
    let before = *form.ratings();
    form.set_rating(Question::TeachingQuality, 4).unwrap();
    assert_eq!(*form.ratings(), before);
    assert_eq!(store.insert_count(), 0);
}

// =============================================================================
// submit — validation
// =============================================================================

#[tokio::test]
async fn submit_with_any_unrated_question_never_inserts() {
    for skipped in Question::ALL {
        let store = Arc::new(MemoryStore::default());
        let mut form = open_form(&store, Role::Student).await;
        for question in Question::ALL.into_iter().filter(|q| *q != skipped) {
            form.set_rating(question, 5).unwrap();
        }

        let err = form.submit().await.unwrap_err();

        assert_eq!(err, SubmitError::Incomplete(ValidationError { missing: vec![skipped] }));
        assert_eq!(form.last_error(), Some(INCOMPLETE_RATINGS_MESSAGE));
        assert_eq!(form.phase(), FormPhase::Open);
        assert!(!form.in_flight());
        assert_eq!(store.insert_count(), 0, "insert issued with {skipped:?} unrated");
    }
}

#[tokio::test]
async fn submit_with_nothing_rated_lists_every_question() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Student).await;
    let err = form.submit().await.unwrap_err();
    assert_eq!(err, SubmitError::Incomplete(ValidationError { missing: Question::ALL.to_vec() }));
}

#[tokio::test]
async fn submit_with_all_questions_rated_inserts_exactly_once() {
    for value in 1..=5 {
        let store = Arc::new(MemoryStore::default());
        let mut form = open_form(&store, Role::Staff).await;
        rate_all(&mut form, value);
        form.set_rating(Question::CampusEnvironment, 6 - value).unwrap();

        form.submit().await.unwrap();

        assert_eq!(store.insert_count(), 1);
        let inserted = store.inserts.lock().unwrap()[0].clone();
        assert_eq!(inserted.q1_fasilitas.get(), value);
        assert_eq!(inserted.q4_lingkungan_kampus.get(), 6 - value);
    }
}

#[tokio::test]
async fn validation_error_clears_on_next_attempt() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Student).await;
    form.set_rating(Question::Facilities, 2).unwrap();
    assert!(form.submit().await.is_err());
    assert!(form.last_error().is_some());

    rate_all(&mut form, 2);
    form.submit().await.unwrap();
    assert_eq!(form.last_error(), None);
}

// =============================================================================
// submit — terminal state
// =============================================================================

#[tokio::test]
async fn new_identity_end_to_end() {
    let store = Arc::new(MemoryStore::default());
    let profile = test_helpers::profile(Role::Student);
    let mut form = SurveyForm::new(store.clone(), profile.clone());

    form.activate().await;
    assert_eq!(*store.lookups.lock().unwrap(), 1);
    assert_eq!(form.phase(), FormPhase::Open);

    rate_all(&mut form, 3);
    form.submit().await.unwrap();

    let inserts = store.inserts.lock().unwrap().clone();
    assert_eq!(inserts.len(), 1);
    let payload = &inserts[0];
    assert_eq!(payload.user_id, profile.id);
    assert_eq!(payload.role, Role::Student);
    for question in Question::ALL {
        let value = serde_json::to_value(payload).unwrap()[question.column()].clone();
        assert_eq!(value, serde_json::json!(3));
    }
    assert_eq!(payload.saran, "");

    assert_eq!(form.phase(), FormPhase::Submitted);
    assert_eq!(form.submit().await, Err(SubmitError::Refused(FormError::Closed)));
    assert_eq!(form.set_rating(Question::Facilities, 1), Err(FormError::Closed));
    assert_eq!(form.set_comment("late"), Err(FormError::Closed));
    assert_eq!(store.insert_count(), 1);
}

#[tokio::test]
async fn comment_is_sent_with_submission() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Lecturer).await;
    rate_all(&mut form, 5);
    form.set_comment("Tambah ruang diskusi").unwrap();
    form.submit().await.unwrap();
    assert_eq!(store.inserts.lock().unwrap()[0].saran, "Tambah ruang diskusi");
}

// =============================================================================
// submit — in flight and write failures
// =============================================================================

#[tokio::test]
async fn second_begin_while_in_flight_is_refused() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Student).await;
    rate_all(&mut form, 4);

    let payload = form.begin_submit().unwrap();
    assert!(form.in_flight());
    assert!(form.view().submitting);
    assert_eq!(form.begin_submit(), Err(SubmitError::Refused(FormError::InFlight)));

    let outcome = form.store().insert(&payload).await;
    form.complete_submit(outcome).unwrap();
    assert!(!form.in_flight());
    assert_eq!(form.phase(), FormPhase::Submitted);
    assert_eq!(store.insert_count(), 1);
}

#[tokio::test]
async fn write_failure_surfaces_message_and_allows_retry() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Student).await;
    rate_all(&mut form, 2);
    store.fail_inserts_with(400, "new row violates row-level security policy");

    let err = form.submit().await.unwrap_err();
    assert_eq!(err, SubmitError::Write("new row violates row-level security policy".into()));
    assert_eq!(form.last_error(), Some("new row violates row-level security policy"));
    assert_eq!(form.phase(), FormPhase::Open);
    assert!(!form.in_flight());

    store.clear_failures();
    form.submit().await.unwrap();
    assert_eq!(form.phase(), FormPhase::Submitted);
    assert_eq!(form.last_error(), None);
    assert_eq!(store.insert_count(), 2);
}

#[tokio::test]
async fn write_failure_without_message_uses_fallback() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Student).await;
    rate_all(&mut form, 1);

    form.begin_submit().unwrap();
    let err = form
        .complete_submit(Err(StoreError::Request("connection reset".into())))
        .unwrap_err();
    assert_eq!(err, SubmitError::Write(SUBMIT_FAILED_MESSAGE.into()));
    assert_eq!(form.last_error(), Some(SUBMIT_FAILED_MESSAGE));
}

#[tokio::test]
async fn duplicate_after_fail_open_check_is_refused_by_storage() {
    let profile = test_helpers::profile(Role::Student);
    let row = test_helpers::response_row(profile.id, Role::Student, 5, "", OffsetDateTime::now_utc());
    let store = Arc::new(MemoryStore::with_rows(vec![row]));
    store.fail_reads_with(500, "timeout");

    let mut form = SurveyForm::new(store.clone(), profile);
    form.activate().await;
    assert_eq!(form.phase(), FormPhase::Open);

    store.clear_failures();
    rate_all(&mut form, 3);
    let err = form.submit().await.unwrap_err();
    assert!(matches!(err, SubmitError::Write(ref msg) if msg.contains("duplicate key")));
    assert_eq!(store.rows.lock().unwrap().len(), 1);
}

// =============================================================================
// view
// =============================================================================

#[tokio::test]
async fn view_reflects_form_state() {
    let store = Arc::new(MemoryStore::default());
    let mut form = open_form(&store, Role::Lecturer).await;
    form.set_rating(Question::AcademicServices, 4).unwrap();
    form.set_comment("Bagus").unwrap();

    let view = form.view();
    assert_eq!(view.phase, FormPhase::Open);
    assert_eq!(view.role, Role::Lecturer);
    assert_eq!(view.full_name, "Sari Wulandari");
    assert_eq!(view.saran, "Bagus");
    assert!(!view.submitting);

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["phase"], "open");
    assert_eq!(json["role"], "dosen");
    assert_eq!(json["ratings"]["q2_pelayanan_akademik"], 4);
    assert_eq!(json["ratings"]["q1_fasilitas"], 0);
}

#[test]
fn terminal_phases() {
    assert!(FormPhase::Submitted.is_terminal());
    assert!(FormPhase::AlreadySubmitted.is_terminal());
    assert!(!FormPhase::Open.is_terminal());
    assert!(!FormPhase::Checking.is_terminal());
}
