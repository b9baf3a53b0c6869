//! Which skills get fetched, and from where.

use skillport::sources::mock::{MockCall, MockFailure, MockOp};
use skillport::sources::{SkipReason, SourceOutcome, SourceSpec};
use walkdir::WalkDir;

use super::fixture::{InstallFixture, SHA_A, SHA_B};

#[test]
fn fetches_listed_skills_with_auxiliary_files() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "# PDF")
        .file("skills/pdf/scripts/extract.py", "print('pdf')")
        .file("skills/docx/SKILL.md", "# DOCX")
        .file("skills/README.md", "not a skill")
        .file("README.md", "repo readme");

    let summary = fx.install(&[SourceSpec::new("owner/repo")]);

    assert_eq!(summary.fetched_skill_count, 2);
    assert_eq!(summary.sources_processed, 1);
    assert_eq!(fx.curated_file("pdf", "SKILL.md"), "# PDF");
    assert_eq!(fx.curated_file("pdf", "scripts/extract.py"), "print('pdf')");
    assert!(!fx.curated("README.md").exists());

    let lock = fx.lock();
    let entry = lock.source("owner/repo").unwrap();
    assert_eq!(entry.resolved_ref, SHA_A);
    assert_eq!(entry.skills.keys().collect::<Vec<_>>(), vec!["docx", "pdf"]);
    assert!(entry.integrity("pdf").unwrap().starts_with("sha256-"));
}

#[test]
fn unsafe_listed_names_are_never_written() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("skills/good/SKILL.md", "ok")
        .file("skills/../evil/SKILL.md", "escape")
        .file("skills/a\\b/SKILL.md", "backslash")
        .file("skills/..sneaky/SKILL.md", "dots");

    let summary = fx.install(&[SourceSpec::new("owner/repo")]);
    assert_eq!(summary.fetched_skill_count, 1);

    let written: Vec<String> = WalkDir::new(fx.base())
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|e| {
            e.path()
                .strip_prefix(fx.base())
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        })
        .collect();
    assert!(written.iter().any(|p| p.ends_with("good")));
    assert!(written.iter().all(|p| !p.contains("evil")), "{written:?}");
    assert!(written.iter().all(|p| !p.contains("sneaky")), "{written:?}");
    assert!(written.iter().all(|p| !p.contains("backslash")), "{written:?}");

    assert!(
        fx.host
            .calls()
            .iter()
            .all(|call| !matches!(call, MockCall::FileContent { path, .. } if !path.starts_with("skills/good/")))
    );
    let lock = fx.lock();
    assert_eq!(
        lock.source("owner/repo").unwrap().skills.keys().collect::<Vec<_>>(),
        vec!["good"]
    );
}

#[test]
fn allow_list_limits_fetched_skills() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "pdf")
        .file("skills/docx/SKILL.md", "docx");

    let summary = fx.install(&[SourceSpec::new("owner/repo").with_skills(["pdf"])]);

    assert_eq!(summary.fetched_skill_count, 1);
    assert!(fx.curated("pdf").is_dir());
    assert!(!fx.curated("docx").exists());
}

#[test]
fn first_source_wins_duplicate_names() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("first/repo", "main", SHA_A)
        .file("skills/x/SKILL.md", "from first");
    fx.host
        .add_repo("second/repo", "main", SHA_B)
        .file("skills/x/SKILL.md", "from second")
        .file("skills/y/SKILL.md", "only second");

    let summary = fx.install(&[SourceSpec::new("first/repo"), SourceSpec::new("second/repo")]);

    assert_eq!(summary.fetched_skill_count, 2);
    assert_eq!(fx.curated_file("x", "SKILL.md"), "from first");
    assert_eq!(fx.curated_file("y", "SKILL.md"), "only second");
    assert!(fx.host.calls_for("second/repo").iter().all(|call| {
        !matches!(call, MockCall::FileContent { path, .. } if path.starts_with("skills/x/"))
    }));

    let lock = fx.lock();
    assert!(lock.source("first/repo").unwrap().skills.contains_key("x"));
    assert!(!lock.source("second/repo").unwrap().skills.contains_key("x"));
}

#[test]
fn trusted_source_still_claims_its_names() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("first/repo", "main", SHA_A)
        .file("skills/x/SKILL.md", "from first");
    fx.host
        .add_repo("second/repo", "main", SHA_B)
        .file("skills/x/SKILL.md", "from second");
    let sources = [SourceSpec::new("first/repo"), SourceSpec::new("second/repo")];
    fx.install(&sources);

    // Second source must resolve again but may not take "x" from the trusted first.
    std::fs::write(fx.paths().lockfile(), {
        let mut lock = fx.lock();
        lock.sources.remove("second/repo");
        serde_json::to_vec(&lock).unwrap()
    })
    .unwrap();
    fx.host.clear_calls();

    let summary = fx.install(&sources);
    assert_eq!(summary.fetched_skill_count, 0);
    assert_eq!(fx.curated_file("x", "SKILL.md"), "from first");
    assert!(fx.host.calls_for("first/repo").is_empty());
}

#[test]
fn local_skill_shadows_remote() {
    let fx = InstallFixture::new();
    fx.write_local_skill("pdf");
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "remote pdf")
        .file("skills/docx/SKILL.md", "remote docx");

    let summary = fx.install(&[SourceSpec::new("owner/repo")]);

    assert_eq!(summary.fetched_skill_count, 1);
    assert!(!fx.curated("pdf").exists());
    assert!(fx.host.calls().iter().all(|call| {
        !matches!(call, MockCall::FileContent { path, .. } if path.starts_with("skills/pdf/"))
    }));
    let lock = fx.lock();
    let entry = lock.source("owner/repo").unwrap();
    assert!(!entry.skills.contains_key("pdf"));
    assert!(entry.skills.contains_key("docx"));
}

#[test]
fn failing_source_does_not_block_later_sources() {
    let fx = InstallFixture::new();
    fx.host.add_repo("broken/repo", "main", SHA_A);
    fx.host
        .fail("broken/repo", MockOp::ResolveRef, MockFailure::Status(500));
    fx.host
        .add_repo("good/repo", "main", SHA_B)
        .file("skills/pdf/SKILL.md", "pdf");

    let summary = fx.install(&[SourceSpec::new("broken/repo"), SourceSpec::new("good/repo")]);

    assert_eq!(summary.sources_processed, 2);
    assert_eq!(summary.fetched_skill_count, 1);
    assert!(matches!(&summary.outcomes[0], SourceOutcome::Failed { source, .. } if source == "broken/repo"));
    let lock = fx.lock();
    assert!(lock.source("broken/repo").is_none());
    assert!(lock.source("good/repo").is_some());
}

#[test]
fn network_failure_mid_fetch_is_isolated() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("flaky/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "pdf");
    fx.host.fail(
        "flaky/repo",
        MockOp::FileContent,
        MockFailure::Transport("connection reset".to_string()),
    );
    fx.host
        .add_repo("good/repo", "main", SHA_B)
        .file("skills/docx/SKILL.md", "docx");

    let summary = fx.install(&[SourceSpec::new("flaky/repo"), SourceSpec::new("good/repo")]);

    assert_eq!(summary.sources_processed, 2);
    assert_eq!(summary.fetched_skill_count, 1);
    assert!(!fx.curated("pdf").exists());
    assert!(fx.curated("docx").is_dir());
}

#[test]
fn missing_skills_dir_means_zero_skills() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("README.md", "no skills here");

    let summary = fx.install(&[SourceSpec::new("owner/repo")]);

    assert_eq!(summary.fetched_skill_count, 0);
    assert!(matches!(summary.outcomes[0], SourceOutcome::Fetched { .. }));
    let lock = fx.lock();
    let entry = lock.source("owner/repo").unwrap();
    assert_eq!(entry.resolved_ref, SHA_A);
    assert!(entry.skills.is_empty());
}

#[test]
fn locked_and_present_source_makes_no_calls() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "pdf");
    let sources = [SourceSpec::new("owner/repo")];
    fx.install(&sources);
    fx.host.clear_calls();

    let summary = fx.install(&sources);

    assert_eq!(summary.fetched_skill_count, 0);
    assert!(fx.host.calls().is_empty());
    assert!(matches!(
        summary.outcomes[0],
        SourceOutcome::Skipped {
            reason: SkipReason::Trusted,
            ..
        }
    ));
    assert!(!summary.lock_written);
}

#[test]
fn missing_curated_dir_triggers_refetch() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "pdf")
        .file("skills/docx/SKILL.md", "docx");
    let sources = [SourceSpec::new("owner/repo")];
    fx.install(&sources);
    std::fs::remove_dir_all(fx.curated("docx")).unwrap();
    fx.host.clear_calls();

    let summary = fx.install(&sources);

    assert_eq!(fx.host.resolve_count(), 1);
    assert_eq!(summary.fetched_skill_count, 2);
    assert!(fx.curated("docx").is_dir());
}

#[test]
fn refetch_replaces_stale_files() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "v1")
        .file("skills/pdf/old.md", "removed upstream");
    let sources = [SourceSpec::new("owner/repo")];
    fx.install(&sources);
    assert!(fx.curated("pdf").join("old.md").is_file());

    fx.host.remove_file("owner/repo", "skills/pdf/old.md");
    fx.host.set_file("owner/repo", "skills/pdf/SKILL.md", "v2");
    fx.run(&sources, &super::fixture::update()).unwrap();

    assert_eq!(fx.curated_file("pdf", "SKILL.md"), "v2");
    assert!(!fx.curated("pdf").join("old.md").exists());
}

#[test]
fn refetch_leaves_other_curated_skills_alone() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("a/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "pdf");
    fx.host
        .add_repo("b/repo", "main", SHA_B)
        .file("skills/docx/SKILL.md", "docx");
    fx.install(&[SourceSpec::new("a/repo"), SourceSpec::new("b/repo")]);

    fx.run(&[SourceSpec::new("a/repo")], &super::fixture::update())
        .unwrap();

    assert!(fx.curated("pdf").is_dir());
    assert!(fx.curated("docx").is_dir());
}

#[test]
fn auxiliary_files_keep_their_names() {
    let fx = InstallFixture::new();
    fx.host
        .add_repo("owner/repo", "main", SHA_A)
        .file("skills/pdf/SKILL.md", "# PDF")
        .file("skills/pdf/.env.example", "KEY=")
        .file("skills/pdf/my notes.md", "notes")
        .file("skills/pdf/docs/guía.md", "guía");

    let summary = fx.install(&[SourceSpec::new("owner/repo")]);

    assert_eq!(summary.fetched_skill_count, 1);
    assert_eq!(fx.curated_file("pdf", ".env.example"), "KEY=");
    assert_eq!(fx.curated_file("pdf", "my notes.md"), "notes");
    assert_eq!(fx.curated_file("pdf", "docs/guía.md"), "guía");
    assert_eq!(fx.curated_integrity("pdf"), fx.locked_integrity("owner/repo", "pdf"));
}
