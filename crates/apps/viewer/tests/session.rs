mod common;

use bytes::Bytes;
use common::{ScriptedApi, skyline_stl};
use pretty_assertions::assert_eq;
use scene::{FIT_YAW_RAD, FitPhase};
use skyline_viewer::bridge::{TRANSPORT_ERROR_MESSAGE, UNKNOWN_ERROR_MESSAGE};
use skyline_viewer::render_loop::FRAME_DT_S;
use skyline_viewer::{ApiError, Bootstrap, Failure, FrameView, ViewerSession};
use streaming::{
    ContributionFilter, FetchError, LoadState, ModelConfiguration, ResourceLocator, resolve,
};

fn locator(year: u32) -> ResourceLocator {
    resolve(&ModelConfiguration::for_year(year))
}

fn shown(view: &FrameView) -> Option<String> {
    match view {
        FrameView::Mesh { mesh } => Some(mesh.locator.path_and_query()),
        _ => None,
    }
}

async fn ready_session(api: &ScriptedApi) -> ViewerSession {
    let mut session = api.session();
    let bootstrap = session.bootstrap().await.expect("bootstrap");
    assert!(matches!(bootstrap, Bootstrap::Ready { .. }), "{bootstrap:?}");
    session
}

#[tokio::test]
async fn latest_selection_wins_when_responses_arrive_out_of_order() {
    let api = ScriptedApi::signed_in("octocat", &[2020, 2021, 2022]);
    let mut session = ready_session(&api).await;

    session.select_year(2021).await;
    assert!(matches!(session.frame(), FrameView::Loading { .. }));
    assert_eq!(
        api.mesh_requests(),
        vec!["/contributions/model?year=2021&contributions=all".to_string()]
    );

    session.select_year(2022).await;
    assert!(matches!(session.frame(), FrameView::Loading { .. }));

    api.answer(&locator(2022), Ok(skyline_stl(8.0)));
    assert_eq!(shown(&session.frame()), Some(locator(2022).path_and_query()));

    api.answer(&locator(2021), Ok(skyline_stl(2.0)));
    for _ in 0..3 {
        assert_eq!(shown(&session.frame()), Some(locator(2022).path_and_query()));
    }
    assert!(session.render().camera_state().fitted);
    assert_eq!(session.render().autofit().fit_count(), 1);
    assert!(session.notifications().is_empty());
}

#[tokio::test]
async fn model_left_behind_still_lands_in_the_cache() {
    let api = ScriptedApi::signed_in("octocat", &[2021, 2022]);
    let mut session = ready_session(&api).await;

    session.select_year(2021).await;
    assert!(matches!(session.frame(), FrameView::Loading { .. }));
    session.select_year(2022).await;
    assert!(matches!(session.frame(), FrameView::Loading { .. }));

    api.answer(&locator(2021), Ok(skyline_stl(2.0)));
    api.answer(&locator(2022), Ok(skyline_stl(8.0)));
    for _ in 0..50 {
        session.frame();
        tokio::task::yield_now().await;
    }
    assert_eq!(session.cache().state(&locator(2021)), Some(LoadState::Ready));
    assert_eq!(session.cache().state(&locator(2022)), Some(LoadState::Ready));

    session.select_year(2021).await;
    assert_eq!(shown(&session.frame()), Some(locator(2021).path_and_query()));
    assert_eq!(api.mesh_requests().len(), 2);
    assert!(session.notifications().is_empty());
}

#[tokio::test]
async fn polling_a_pending_model_issues_one_fetch() {
    let api = ScriptedApi::signed_in("octocat", &[2021]);
    let mut session = ready_session(&api).await;

    session.select_year(2021).await;
    for _ in 0..10 {
        assert!(matches!(session.frame(), FrameView::Loading { .. }));
    }
    assert_eq!(session.cache().fetch_count(), 1);
    assert_eq!(session.cache().state(&locator(2021)), Some(LoadState::Pending));

    api.answer(&locator(2021), Ok(skyline_stl(1.0)));
    assert!(shown(&session.frame()).is_some());
    assert_eq!(api.mesh_requests().len(), 1);
}

#[tokio::test]
async fn no_imported_years_offers_only_import() {
    let api = ScriptedApi::signed_in("octocat", &[]);
    let mut session = api.session();

    assert_eq!(session.bootstrap().await.expect("bootstrap"), Bootstrap::ImportOnly);
    assert!(!session.can_select_year());

    session.select_year(2021).await;
    assert_eq!(session.store().model().year, None);
    assert!(matches!(session.frame(), FrameView::Empty));
    assert!(api.mesh_requests().is_empty());
    assert_eq!(session.cache().fetch_count(), 0);
}

#[tokio::test]
async fn importing_into_an_empty_session_selects_the_year() {
    let api = ScriptedApi::signed_in("octocat", &[]);
    api.auto_answer(Ok(skyline_stl(5.0)));
    let mut session = api.session();
    session.bootstrap().await.expect("bootstrap");

    assert!(session.import_year(2019).await.expect("import"));
    assert_eq!(session.years(), &[2019]);
    assert_eq!(session.store().model().year, Some(2019));
    assert_eq!(shown(&session.frame()), Some(locator(2019).path_and_query()));
}

#[tokio::test]
async fn importing_year_zero_is_refused_locally() {
    let api = ScriptedApi::signed_in("octocat", &[2020]);
    let mut session = ready_session(&api).await;

    assert!(!session.import_year(0).await.expect("no api call"));
    assert!(!session.import_year(-2021).await.expect("no api call"));
    assert_eq!(
        api.api_calls(),
        vec!["current_user".to_string(), "years".to_string()]
    );
    assert_eq!(session.years(), &[2020]);
    assert_eq!(session.store().model().year, None);
    assert!(session.notifications().is_empty());
}

#[tokio::test]
async fn import_evicts_cached_models_for_the_year() {
    let api = ScriptedApi::signed_in("octocat", &[2020]);
    api.auto_answer(Ok(skyline_stl(4.0)));
    let mut session = ready_session(&api).await;

    session.select_year(2020).await;
    assert!(shown(&session.frame()).is_some());
    assert_eq!(session.cache().fetch_count(), 1);

    assert!(session.import_year(2020).await.expect("import"));
    assert_eq!(session.cache().state(&locator(2020)), None);

    let mesh = match session.frame() {
        FrameView::Mesh { mesh } => mesh,
        other => panic!("expected mesh, got {other:?}"),
    };
    assert_eq!(mesh.generation, 2);
    assert_eq!(session.cache().fetch_count(), 2);
    assert_eq!(session.render().autofit().fit_count(), 2);
}

#[tokio::test]
async fn work_filter_falls_back_to_all_without_a_notification() {
    let api = ScriptedApi::signed_in("octocat", &[2020, 2021]);
    api.set_work_available(2020, true);
    api.set_work_available(2021, false);
    api.auto_answer(Ok(skyline_stl(3.0)));
    let mut session = ready_session(&api).await;

    session.select_year(2020).await;
    session
        .set_contribution_filter(ContributionFilter::Work)
        .await;
    assert_eq!(
        shown(&session.frame()).as_deref(),
        Some("/contributions/model?year=2020&contributions=work")
    );

    session.select_year(2021).await;
    assert_eq!(session.store().model().contributions, ContributionFilter::All);
    assert_eq!(
        shown(&session.frame()).as_deref(),
        Some("/contributions/model?year=2021&contributions=all")
    );
    assert!(session.notifications().is_empty());
}

#[tokio::test]
async fn filter_is_not_requested_before_availability_is_known() {
    let api = ScriptedApi::signed_in("octocat", &[2022]);
    api.auto_answer(Ok(skyline_stl(3.0)));
    let mut session = ready_session(&api).await;

    session.select_year(2022).await;
    session.store_mut().forget_work_availability(2022);
    session
        .store_mut()
        .set_contribution_filter(ContributionFilter::Personal);

    assert!(matches!(
        session.frame(),
        FrameView::Loading { locator: None }
    ));
    assert!(api.mesh_requests().is_empty());

    session.store_mut().record_work_availability(2022, false);
    assert_eq!(
        shown(&session.frame()).as_deref(),
        Some("/contributions/model?year=2022&contributions=all")
    );
}

#[tokio::test]
async fn failed_availability_check_is_reported_and_filter_reset() {
    let api = ScriptedApi::signed_in("octocat", &[2021]);
    api.fail_work_available(
        2021,
        ApiError::Transport {
            message: "connection reset".to_string(),
        },
    );
    let mut session = ready_session(&api).await;

    session.select_year(2021).await;
    session
        .set_contribution_filter(ContributionFilter::Work)
        .await;

    assert_eq!(session.store().model().contributions, ContributionFilter::All);
    let events = session.drain_notifications();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload.message, TRANSPORT_ERROR_MESSAGE);
}

#[tokio::test]
async fn camera_fits_once_and_refits_on_year_change() {
    let api = ScriptedApi::signed_in("octocat", &[2020, 2021]);
    api.auto_answer(Ok(skyline_stl(6.0)));
    let mut session = ready_session(&api).await;

    session.select_year(2020).await;
    session.frame();
    assert_eq!(session.render().autofit().phase(), FitPhase::Fitted);
    assert_eq!(session.render().camera().yaw_rad, FIT_YAW_RAD);

    session.render_mut().camera_mut().orbit(120.0, 0.0);
    let moved = *session.render().camera();
    for _ in 0..5 {
        session.frame();
    }
    assert_eq!(*session.render().camera(), moved);

    session.select_year(2021).await;
    session.frame();
    session.select_year(2020).await;
    session.frame();

    assert_eq!(session.render().autofit().fit_count(), 3);
    assert_eq!(session.render().camera().yaw_rad, FIT_YAW_RAD);
    assert_eq!(session.cache().fetch_count(), 2);
}

#[tokio::test]
async fn failed_load_keeps_previous_mesh_and_notifies_once() {
    let api = ScriptedApi::signed_in("octocat", &[2020, 2021]);
    let mut session = ready_session(&api).await;

    session.select_year(2020).await;
    session.frame();
    api.answer(&locator(2020), Ok(skyline_stl(2.0)));
    assert!(shown(&session.frame()).is_some());

    session.select_year(2021).await;
    session.frame();
    api.answer(
        &locator(2021),
        Err(FetchError::Api {
            status: 404,
            detail: "No contributions found for 2021.".to_string(),
        }),
    );

    for _ in 0..3 {
        match session.frame() {
            FrameView::Error { message, previous } => {
                assert_eq!(message, "No contributions found for 2021.");
                let previous = previous.expect("previous mesh stays on screen");
                assert_eq!(previous.locator, locator(2020));
            }
            other => panic!("expected error frame, got {other:?}"),
        }
    }
    let events = session.drain_notifications();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].payload.failure,
        Failure::Api {
            detail: "No contributions found for 2021.".to_string()
        }
    );
    let frame = events[0].frame.expect("reported from the render loop");
    assert_eq!(frame.index, 3);
    assert_eq!(frame.time_s, 3.0 * FRAME_DT_S);
    assert_eq!(session.render().autofit().phase(), FitPhase::Failed);

    session.retry();
    assert!(matches!(session.frame(), FrameView::Loading { .. }));
    assert_eq!(api.mesh_requests().len(), 3);
}

#[tokio::test]
async fn first_load_failure_is_an_explicit_error_frame() {
    let api = ScriptedApi::signed_in("octocat", &[2020]);
    api.auto_answer(Ok(Bytes::from_static(b"<!doctype html><p>proxy error</p>")));
    let mut session = ready_session(&api).await;

    session.select_year(2020).await;
    match session.frame() {
        FrameView::Error { message, previous } => {
            assert_eq!(message, TRANSPORT_ERROR_MESSAGE);
            assert!(previous.is_none());
        }
        other => panic!("expected error frame, got {other:?}"),
    }
    assert_eq!(session.drain_notifications().len(), 1);
}

#[tokio::test]
async fn bare_status_failures_are_unknown() {
    let api = ScriptedApi::signed_in("octocat", &[2020]);
    api.auto_answer(Err(FetchError::Status { status: 502 }));
    let mut session = ready_session(&api).await;

    session.select_year(2020).await;
    let view = session.frame();
    assert!(matches!(view, FrameView::Error { .. }), "{view:?}");
    let events = session.drain_notifications();
    assert_eq!(events[0].payload.message, UNKNOWN_ERROR_MESSAGE);
}

#[tokio::test]
async fn signed_out_session_redirects_to_login() {
    let api = ScriptedApi::default();
    let mut session = api.session();

    assert_eq!(
        session.bootstrap().await.expect("bootstrap"),
        Bootstrap::LoginRequired {
            redirect: "/auth/login".to_string()
        }
    );
    assert_eq!(api.api_calls(), vec!["current_user".to_string()]);
    assert!(matches!(session.frame(), FrameView::Empty));
}

#[tokio::test]
async fn import_conflict_is_shown_verbatim() {
    let api = ScriptedApi::signed_in("octocat", &[2020]);
    api.fail_next_import(ApiError::Api {
        status: 409,
        detail: "Contributions already imported.".to_string(),
    });
    let mut session = ready_session(&api).await;

    let err = session.import_year(2020).await.expect_err("conflict");
    assert!(matches!(err, ApiError::Api { status: 409, .. }));
    let events = session.drain_notifications();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload.message, "Contributions already imported.");
}

#[tokio::test]
async fn export_uses_the_server_naming_scheme() {
    let api = ScriptedApi::signed_in("octocat", &[2021]);
    let mut session = ready_session(&api).await;

    assert_eq!(session.export().await.expect("export"), None);

    session.select_year(2021).await;
    let export = session.export().await.expect("export").expect("year selected");
    assert_eq!(export.filename, "octocat-2021-2021.stl");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(&export.filename);
    std::fs::write(&path, &export.download.bytes).expect("write");
    let mesh = formats::decode_stl(&std::fs::read(&path).expect("read")).expect("decode");
    assert_eq!(mesh.triangle_count(), 2);
}
