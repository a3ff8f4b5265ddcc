mod common;

use anyhow::{Context, Result};
use common::{TestApp, PASSWORD};
use jobboard::auth::{self, RegisterForm};
use jobboard::backend::tables;
use jobboard::dashboard::Page;
use jobboard::error::ErrorKind;
use jobboard::models::Role;

#[tokio::test]
async fn pelamar_registration_flow() -> Result<()> {
    let app = TestApp::new().await?;

    let form = TestApp::register_form(Role::Pelamar, "ani@example.com");
    let registration = auth::register(&app.state, form).await?;
    assert_eq!(registration.profile.role, Role::Pelamar);
    assert!(registration.profile.is_verified);
    assert_eq!(registration.profile.username.as_deref(), Some("ani"));
    assert_eq!(registration.profile.company_name, None);

    let session = registration.session.context("expected a session")?;
    assert_eq!(session.role(), Role::Pelamar);
    assert_eq!(session.user.email.as_deref(), Some("ani@example.com"));

    let resumed = auth::resume(&app.state, session.user.token().as_str()).await?;
    assert_eq!(resumed.user.user_id, session.user.user_id);
    assert_eq!(resumed.profile, registration.profile);

    let login = auth::login(&app.state, " ani@example.com ", PASSWORD).await?;
    assert_eq!(login.profile.id, registration.profile.id);
    assert_eq!(login.role().dashboard(), Page::PelamarDashboard);

    Ok(())
}

#[tokio::test]
async fn hrd_registration_starts_unverified() -> Result<()> {
    let app = TestApp::new().await?;

    let mut form = TestApp::register_form(Role::Hrd, "hr@maju.co.id");
    form.company_name = None;
    let err = auth::register(&app.state, form.clone())
        .await
        .expect_err("company name is required for HRD");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(app.backend.rows(tables::USER_PROFILES).await.is_empty());

    form.company_name = Some("PT Maju Bersama".into());
    let registration = auth::register(&app.state, form).await?;
    assert_eq!(registration.profile.role, Role::Hrd);
    assert!(!registration.profile.is_verified);
    assert_eq!(registration.profile.company_name.as_deref(), Some("PT Maju Bersama"));

    let current = registration.session.context("expected a session")?;
    assert_eq!(current.role().dashboard(), Page::HrdDashboard);

    Ok(())
}

#[tokio::test]
async fn registration_rejects_bad_input() -> Result<()> {
    let app = TestApp::new().await?;

    let short = RegisterForm {
        password: "12345".into(),
        ..TestApp::register_form(Role::Pelamar, "short@example.com")
    };
    let err = auth::register(&app.state, short).await.expect_err("password too short");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let no_email = TestApp::register_form(Role::Pelamar, "not-an-email");
    let err = auth::register(&app.state, no_email).await.expect_err("email without @");
    assert_eq!(err.kind(), ErrorKind::Validation);

    auth::register(&app.state, TestApp::register_form(Role::Pelamar, "dup@example.com")).await?;
    let err = auth::register(&app.state, TestApp::register_form(Role::Hrd, "dup@example.com"))
        .await
        .expect_err("email already registered");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(app.backend.rows(tables::USER_PROFILES).await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn login_failures_redirect_to_login() -> Result<()> {
    let app = TestApp::new().await?;
    auth::register(&app.state, TestApp::register_form(Role::Pelamar, "budi@example.com")).await?;

    let err = auth::login(&app.state, "budi@example.com", "wrong-password")
        .await
        .expect_err("wrong password");
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    assert_eq!(err.message(), "invalid email or password");
    assert_eq!(err.redirect(), Some(Page::Login));

    let err = auth::login(&app.state, "nobody@example.com", PASSWORD)
        .await
        .expect_err("unknown account");
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);

    Ok(())
}

#[tokio::test]
async fn resume_refuses_stale_sessions() -> Result<()> {
    let app = TestApp::new().await?;
    let current = app.register(Role::Pelamar).await?;

    let expired = app.backend.expired_token(current.user.user_id)?;
    let err = auth::resume(&app.state, &expired).await.expect_err("expired token");
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    assert_eq!(err.redirect(), Some(Page::Login));

    let err = auth::resume(&app.state, "not-a-jwt").await.expect_err("garbage token");
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);

    auth::logout(&app.state, &current.user).await?;
    let err = auth::resume(&app.state, current.user.token().as_str())
        .await
        .expect_err("signed-out token");
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);

    Ok(())
}

#[tokio::test]
async fn roles_are_kept_on_their_own_dashboard() -> Result<()> {
    let app = TestApp::new().await?;

    let pelamar = app.register(Role::Pelamar).await?;
    let err = pelamar.clone().into_hrd().expect_err("pelamar is not HRD");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(err.redirect(), Some(Page::PelamarDashboard));
    assert!(pelamar.into_pelamar().is_ok());

    let hrd = app.register(Role::Hrd).await?;
    let err = hrd.clone().into_pelamar().expect_err("HRD is not a pelamar");
    assert_eq!(err.redirect(), Some(Page::HrdDashboard));

    let unverified = hrd.into_hrd()?;
    let err = unverified.require_verified().expect_err("new HRD is unverified");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    Ok(())
}

#[tokio::test]
async fn email_confirmation_defers_the_session() -> Result<()> {
    let app = TestApp::new().await?;
    app.backend.require_email_confirmation(true);

    let registration =
        auth::register(&app.state, TestApp::register_form(Role::Pelamar, "sari@example.com")).await?;
    assert!(registration.session.is_none());
    assert_eq!(app.backend.rows(tables::USER_PROFILES).await.len(), 1);

    let current = auth::login(&app.state, "sari@example.com", PASSWORD).await?;
    assert_eq!(current.profile.id, registration.profile.id);

    Ok(())
}

#[tokio::test]
async fn account_without_profile_is_sent_home() -> Result<()> {
    let app = TestApp::new().await?;
    app.state.auth.sign_up("orphan@example.com", PASSWORD).await?;

    let err = auth::login(&app.state, "orphan@example.com", PASSWORD)
        .await
        .expect_err("no profile row");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.redirect(), Some(Page::Home));

    Ok(())
}
