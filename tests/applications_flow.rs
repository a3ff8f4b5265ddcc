mod common;

use anyhow::{Context, Result};
use common::TestApp;
use jobboard::applications::{self, ApplyForm, CoverLetter, DocumentUpdate};
use jobboard::backend::tables;
use jobboard::error::ErrorKind;
use jobboard::models::ApplicationStatus;
use jobboard::validation::{UploadFile, MAX_UPLOAD_BYTES};

fn cv_only() -> ApplyForm {
    ApplyForm {
        cv: TestApp::pdf("cv.pdf", 2048),
        cover_letter: None,
    }
}

#[tokio::test]
async fn application_flow() -> Result<()> {
    let app = TestApp::new().await?;
    let hrd = app.hrd(true).await?;
    let pelamar = app.pelamar().await?;
    let job = app.post_job(&hrd, "Backend Engineer").await?;

    let form = ApplyForm {
        cv: TestApp::pdf("cv.pdf", 4096),
        cover_letter: Some(CoverLetter::Text("Saya tertarik dengan posisi ini.".into())),
    };
    let application = applications::apply(&app.state, &pelamar, job.id, &form).await?;
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert_eq!(application.job_id, job.id);
    assert_eq!(application.user_id, pelamar.user_id());
    assert_eq!(
        application.cover_letter.as_deref(),
        Some("Saya tertarik dengan posisi ini.")
    );
    assert_eq!(application.cover_letter_url, None);

    let cv_url = application.cv_url.clone().context("cv url stored")?;
    let stored = app.storage.get_by_url(&cv_url).await.context("cv uploaded")?;
    assert!(stored.key.starts_with(&format!("cvs/{}_cv_", pelamar.user_id())));
    assert!(stored.key.ends_with(".pdf"));
    assert_eq!(stored.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(stored.bytes.len(), 4096);

    let mine = applications::list_mine(&app.state, &pelamar).await?;
    assert_eq!(mine.len(), 1);
    let summary = mine[0].job.as_ref().context("job summary joined")?;
    assert_eq!(summary.title, "Backend Engineer");

    let found = applications::find_for_job(&app.state, &pelamar, job.id).await?;
    assert_eq!(found.map(|a| a.id), Some(application.id));

    let applicants = applications::list_for_job(&app.state, &hrd, job.id).await?;
    assert_eq!(applicants.len(), 1);
    assert_eq!(applicants[0].job_title.as_deref(), Some("Backend Engineer"));
    let profile = applicants[0].profile.as_ref().context("applicant profile joined")?;
    assert_eq!(profile.id, pelamar.user_id());
    assert_eq!(profile.full_name.as_deref(), Some("Budi Santoso"));

    let updated = applications::update_status(
        &app.state,
        &hrd,
        application.id,
        ApplicationStatus::PassedAdministration,
        Some("Jadwalkan tes tulis."),
    )
    .await?;
    assert_eq!(updated.status, ApplicationStatus::PassedAdministration);
    assert_eq!(updated.notes.as_deref(), Some("Jadwalkan tes tulis."));

    let kept = applications::update_status(
        &app.state,
        &hrd,
        application.id,
        ApplicationStatus::PassedAdministration,
        None,
    )
    .await?;
    assert_eq!(kept.notes.as_deref(), Some("Jadwalkan tes tulis."));
    let cleared = applications::update_status(
        &app.state,
        &hrd,
        application.id,
        ApplicationStatus::PassedAdministration,
        Some("  "),
    )
    .await?;
    assert_eq!(cleared.notes, None);

    let stats = applications::stats(&app.state, &hrd, None).await?;
    assert_eq!(stats.total, 1);
    assert_eq!(stats.passed_administration, 1);
    assert_eq!(stats.in_progress(), 1);

    let per_job = applications::applicants_per_job(&app.state, &hrd).await?;
    assert_eq!(per_job.len(), 1);
    assert_eq!(per_job[0].1, 1);

    Ok(())
}

#[tokio::test]
async fn one_application_per_job() -> Result<()> {
    let app = TestApp::new().await?;
    let hrd = app.hrd(true).await?;
    let pelamar = app.pelamar().await?;
    let job = app.post_job(&hrd, "QA Engineer").await?;

    applications::apply(&app.state, &pelamar, job.id, &cv_only()).await?;
    let uploaded = app.storage.object_count().await;

    let err = applications::apply(&app.state, &pelamar, job.id, &cv_only())
        .await
        .expect_err("second application");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.message(), "you have already applied for this job");
    assert_eq!(app.storage.object_count().await, uploaded);
    assert_eq!(app.backend.rows(tables::APPLICATIONS).await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn rejects_bad_documents_before_uploading() -> Result<()> {
    let app = TestApp::new().await?;
    let hrd = app.hrd(true).await?;
    let pelamar = app.pelamar().await?;
    let job = app.post_job(&hrd, "Writer").await?;

    let word = ApplyForm {
        cv: UploadFile::new(
            "cv.docx",
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document".into()),
            b"PK\x03\x04".to_vec(),
        ),
        cover_letter: None,
    };
    let err = applications::apply(&app.state, &pelamar, job.id, &word).await.expect_err("not a pdf");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let huge = ApplyForm {
        cv: TestApp::pdf("cv.pdf", MAX_UPLOAD_BYTES + 1),
        cover_letter: None,
    };
    let err = applications::apply(&app.state, &pelamar, job.id, &huge).await.expect_err("too big");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let bad_cover = ApplyForm {
        cv: TestApp::pdf("cv.pdf", 1024),
        cover_letter: Some(CoverLetter::File(UploadFile::new(
            "cover.txt",
            Some("text/plain".into()),
            b"hello".to_vec(),
        ))),
    };
    let err = applications::apply(&app.state, &pelamar, job.id, &bad_cover)
        .await
        .expect_err("cover letter not a pdf");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let untyped = ApplyForm {
        cv: UploadFile::new("cv.PDF", None, b"%PDF-1.7".to_vec()),
        cover_letter: None,
    };
    let missing_job = uuid::Uuid::new_v4();
    let err = applications::apply(&app.state, &pelamar, missing_job, &untyped)
        .await
        .expect_err("no such job");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(app.storage.object_count().await, 0);
    assert!(app.backend.rows(tables::APPLICATIONS).await.is_empty());

    Ok(())
}

#[tokio::test]
async fn failed_insert_removes_uploads() -> Result<()> {
    let app = TestApp::new().await?;
    let hrd = app.hrd(true).await?;
    let pelamar = app.pelamar().await?;
    let job = app.post_job(&hrd, "Support").await?;

    let form = ApplyForm {
        cv: TestApp::pdf("cv.pdf", 1024),
        cover_letter: Some(CoverLetter::File(TestApp::pdf("cover.pdf", 512))),
    };
    app.backend.fail_next_insert(tables::APPLICATIONS).await;
    let err = applications::apply(&app.state, &pelamar, job.id, &form)
        .await
        .expect_err("insert fails");
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(app.storage.object_count().await, 0);

    let application = applications::apply(&app.state, &pelamar, job.id, &form).await?;
    assert!(application.cover_letter_url.is_some());
    assert_eq!(application.cover_letter, None);
    assert_eq!(app.storage.object_count().await, 2);

    Ok(())
}

#[tokio::test]
async fn decided_applications_are_frozen_for_the_applicant() -> Result<()> {
    let app = TestApp::new().await?;
    let hrd = app.hrd(true).await?;
    let pelamar = app.pelamar().await?;
    let job = app.post_job(&hrd, "Sales").await?;
    let application = applications::apply(&app.state, &pelamar, job.id, &cv_only()).await?;

    let nothing = DocumentUpdate::default();
    let err = applications::update_documents(&app.state, &pelamar, application.id, &nothing)
        .await
        .expect_err("nothing to replace");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let update = DocumentUpdate {
        cv: None,
        cover_letter: Some(TestApp::pdf("cover.pdf", 256)),
    };
    let replaced = applications::update_documents(&app.state, &pelamar, application.id, &update).await?;
    assert!(replaced.cover_letter_url.is_some());
    assert_eq!(replaced.cv_url, application.cv_url);

    applications::update_status(&app.state, &hrd, application.id, ApplicationStatus::Rejected, None).await?;

    let err = applications::update_documents(&app.state, &pelamar, application.id, &update)
        .await
        .expect_err("rejected application");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = applications::withdraw(&app.state, &pelamar, application.id)
        .await
        .expect_err("rejected application");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Employers may still move a decided application.
    let reopened = applications::update_status(
        &app.state,
        &hrd,
        application.id,
        ApplicationStatus::PassedInterview,
        None,
    )
    .await?;
    assert_eq!(reopened.status, ApplicationStatus::PassedInterview);
    applications::withdraw(&app.state, &pelamar, application.id).await?;
    assert!(applications::list_mine(&app.state, &pelamar).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn applications_stay_private() -> Result<()> {
    let app = TestApp::new().await?;
    let owner = app.hrd(true).await?;
    let rival = app.hrd(true).await?;
    let pelamar = app.pelamar().await?;
    let snoop = app.pelamar().await?;
    let job = app.post_job(&owner, "Finance").await?;
    let application = applications::apply(&app.state, &pelamar, job.id, &cv_only()).await?;

    let err = applications::list_for_job(&app.state, &rival, job.id)
        .await
        .expect_err("rival HRD");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = applications::update_status(
        &app.state,
        &rival,
        application.id,
        ApplicationStatus::Accepted,
        None,
    )
    .await
    .expect_err("rival HRD");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(applications::list_for_owner(&app.state, &rival).await?.is_empty());

    let err = applications::get_mine(&app.state, &snoop, application.id)
        .await
        .expect_err("another applicant");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = applications::withdraw(&app.state, &snoop, application.id)
        .await
        .expect_err("another applicant");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let mine = applications::get_mine(&app.state, &pelamar, application.id).await?;
    assert_eq!(mine.status, ApplicationStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn stats_per_listing() -> Result<()> {
    let app = TestApp::new().await?;
    let hrd = app.hrd(true).await?;
    let first = app.post_job(&hrd, "Frontend").await?;
    let second = app.post_job(&hrd, "Mobile").await?;

    let statuses = [
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::PassedWrittenTest,
    ];
    for status in statuses {
        let pelamar = app.pelamar().await?;
        let application = applications::apply(&app.state, &pelamar, first.id, &cv_only()).await?;
        applications::update_status(&app.state, &hrd, application.id, status, None).await?;
    }
    let late = app.pelamar().await?;
    applications::apply(&app.state, &late, second.id, &cv_only()).await?;

    let overall = applications::stats(&app.state, &hrd, None).await?;
    assert_eq!(overall.total, 4);
    assert_eq!(overall.accepted, 1);
    assert_eq!(overall.rejected, 1);
    assert_eq!(overall.pending, 1);
    assert_eq!(overall.in_progress(), 2);

    let only_first = applications::stats(&app.state, &hrd, Some(first.id)).await?;
    assert_eq!(only_first.total, 3);
    assert_eq!(only_first.pending, 0);

    let counts = applications::applicants_per_job(&app.state, &hrd).await?;
    let counts: Vec<_> = counts.into_iter().map(|(job, n)| (job.id, n)).collect();
    assert_eq!(counts, vec![(second.id, 1), (first.id, 3)]);

    let everyone = applications::list_for_owner(&app.state, &hrd).await?;
    assert_eq!(everyone.len(), 4);
    assert_eq!(everyone[0].job_title.as_deref(), Some("Mobile"));

    Ok(())
}
