// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{Call, TransferFixture};

use anyhow::Result;
use indoc::indoc;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use wpdeploy::{
    recipe::{Category, Recipe, RecipeError},
    rsync::RsyncConfig,
    Settings,
};

const SITE: &str = indoc! {r#"
    [localhost]
    current_path = "/home/blah/site/public"
    uploads_path = "/home/blah/site/shared"

    [[host]]
    name = "production"
    hostname = "blah.org"
    user = "deploy"
    deploy_path = "/var/www/blah"
    release_path = "/var/www/blah/public"
    uploads_path = "/var/www/blah/shared"

    [[host]]
    name = "staging"
    hostname = "staging.blah.org"
    deploy_path = "/var/www/staging"

    [filters]
    themes = ["- node_modules", "- /blah-theme/src"]

    [[package]]
    path = "packages/blah-plugin"
    remote_path = "wp-content/plugins/blah-plugin"
    filter = ["- /tests"]

    [rsync]
    exclude = [".git"]
    filter-perdir = ".deployfilter"
    options = ["delete-after"]
"#};

fn upload(source: &str, destination: &str, options: &[&str]) -> Call {
    Call::Upload {
        source: source.into(),
        destination: destination.into(),
        options: options.iter().map(ToString::to_string).collect(),
    }
}

fn download(source: &str, destination: &str, options: &[&str]) -> Call {
    Call::Download {
        source: source.into(),
        destination: destination.into(),
        options: options.iter().map(ToString::to_string).collect(),
    }
}

#[test]
fn push_themes() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);

    recipe.push(Category::Themes)?;

    assert_eq!(
        fixture.calls(),
        vec![upload(
            "/home/blah/site/public/wp-content/themes/",
            "/var/www/blah/public/wp-content/themes/",
            &[
                "--delete-after",
                "--exclude=.git",
                "--filter=- node_modules",
                "--filter=- /blah-theme/src",
                "--filter=dir-merge .deployfilter",
            ],
        )]
    );

    Ok(())
}

#[test]
fn pull_plugins_from_deploy_path() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("staging")?, &fixture);

    recipe.pull(Category::Plugins)?;

    assert_eq!(
        fixture.calls(),
        vec![download(
            "/var/www/staging/wp-content/plugins/",
            "/home/blah/site/public/wp-content/plugins/",
            &[
                "--delete-after",
                "--exclude=.git",
                "--filter=dir-merge .deployfilter",
            ],
        )]
    );

    Ok(())
}

#[test]
fn uploads_use_uploads_base_paths() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);

    recipe.sync(Category::Uploads)?;

    let calls = fixture.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].paths(),
        (
            "/home/blah/site/shared/wp-content/uploads/",
            "/var/www/blah/shared/wp-content/uploads/"
        )
    );
    assert_eq!(
        calls[1].paths(),
        (
            "/var/www/blah/shared/wp-content/uploads/",
            "/home/blah/site/shared/wp-content/uploads/"
        )
    );

    Ok(())
}

#[test]
fn wp_core_uses_site_root() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);

    recipe.push(Category::Wp)?;

    let calls = fixture.calls();
    assert_eq!(
        calls[0].paths(),
        ("/home/blah/site/public/", "/var/www/blah/public/")
    );
    let options = calls[0].options();
    assert!(options.contains(&"--filter=- wp-config-local.php".to_string()));
    assert_eq!(
        options.iter().filter(|opt| opt.starts_with("--filter=")).count(),
        settings.filters.wp.len() + 1
    );

    Ok(())
}

#[test]
fn push_packages_creates_remote_dir_first() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);

    recipe.push_packages()?;

    assert_eq!(
        fixture.calls(),
        vec![
            Call::RemoteDir("/var/www/blah/public/wp-content/plugins/blah-plugin/".into()),
            upload(
                "/home/blah/site/public/packages/blah-plugin/",
                "/var/www/blah/public/wp-content/plugins/blah-plugin/",
                &[
                    "--delete-after",
                    "--exclude=.git",
                    "--filter=- /tests",
                    "--filter=dir-merge .deployfilter",
                ],
            ),
        ]
    );

    Ok(())
}

#[test]
fn pull_files_runs_every_category_in_order() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);

    recipe.pull_files()?;

    let sources = fixture
        .calls()
        .iter()
        .map(|call| call.paths().0.to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        sources,
        vec![
            "/var/www/blah/public/",
            "/var/www/blah/shared/wp-content/uploads/",
            "/var/www/blah/public/wp-content/plugins/",
            "/var/www/blah/public/wp-content/mu-plugins/",
            "/var/www/blah/public/wp-content/themes/",
            "/var/www/blah/public/wp-content/plugins/blah-plugin/",
        ]
    );

    Ok(())
}

#[test]
fn push_files_stops_at_first_failure() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::failing_on("plugins");
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);

    let result = recipe.push_files();
    assert!(matches!(result, Err(RecipeError::Transfer(_))));

    // wp, uploads, then the failing plugins push.
    assert_eq!(fixture.calls().len(), 3);

    Ok(())
}

#[test]
fn verbose_defaults_reach_every_transfer() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::new();
    let mut defaults = settings.rsync.clone();
    defaults.push_option("verbose");
    let recipe =
        Recipe::new(&settings, settings.host("staging")?, &fixture).with_defaults(defaults);

    recipe.push(Category::MuPlugins)?;

    assert_eq!(
        fixture.calls()[0].options(),
        &[
            "--delete-after".to_string(),
            "--verbose".to_string(),
            "--exclude=.git".to_string(),
            "--filter=dir-merge .deployfilter".to_string(),
        ]
    );

    Ok(())
}

#[test]
fn missing_rsync_table_uses_recipe_default() -> Result<()> {
    let settings: Settings = indoc! {r#"
        [localhost]
        current_path = "/home/blah/site"

        [[host]]
        name = "production"
        hostname = "blah.org"
        deploy_path = "/var/www/blah"
    "#}
    .parse()?;
    assert_eq!(settings.rsync, RsyncConfig::recipe_default());

    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);
    recipe.pull(Category::Themes)?;

    assert_eq!(
        fixture.calls(),
        vec![download(
            "/var/www/blah/wp-content/themes/",
            "/home/blah/site/wp-content/themes/",
            &["--delete-after", "--filter=dir-merge .deployfilter"],
        )]
    );

    Ok(())
}

#[sealed_test]
fn rule_files_from_config_are_merged() -> Result<()> {
    std::fs::write("excludes.txt", "*.log\n")?;

    let settings: Settings = indoc! {r#"
        [localhost]
        current_path = "/home/blah/site"

        [[host]]
        name = "production"
        hostname = "blah.org"
        deploy_path = "/var/www/blah"

        [rsync]
        exclude = [".git"]
        exclude-file = "excludes.txt"
        filter-file = "missing-filter.txt"
        options = ["delete-after"]
    "#}
    .parse()?;

    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);
    recipe.push(Category::Plugins)?;

    assert_eq!(
        fixture.calls()[0].options(),
        &[
            "--delete-after".to_string(),
            "--exclude=.git".to_string(),
            "--exclude-from=excludes.txt".to_string(),
        ]
    );

    Ok(())
}

#[test]
fn languages_sync_on_request_only() -> Result<()> {
    let settings: Settings = SITE.parse()?;
    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("staging")?, &fixture);

    recipe.sync(Category::Languages)?;

    assert_eq!(
        fixture.calls(),
        vec![
            upload(
                "/home/blah/site/public/wp-content/languages/",
                "/var/www/staging/wp-content/languages/",
                &[
                    "--delete-after",
                    "--exclude=.git",
                    "--filter=dir-merge .deployfilter",
                ],
            ),
            download(
                "/var/www/staging/wp-content/languages/",
                "/home/blah/site/public/wp-content/languages/",
                &[
                    "--delete-after",
                    "--exclude=.git",
                    "--filter=dir-merge .deployfilter",
                ],
            ),
        ]
    );

    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("staging")?, &fixture);
    recipe.push_files()?;
    assert!(fixture
        .calls()
        .iter()
        .all(|call| !call.paths().0.contains("languages")));

    Ok(())
}

#[test]
fn local_layout_differs_from_remote() -> Result<()> {
    let settings: Settings = indoc! {r#"
        [localhost]
        current_path = "/home/blah/bedrock/web"

        [localhost.paths]
        themes_dir = "app/themes"

        [[host]]
        name = "production"
        hostname = "blah.org"
        deploy_path = "/var/www/blah"

        [filters]
        themes = ["- node_modules"]
    "#}
    .parse()?;
    let fixture = TransferFixture::new();
    let recipe = Recipe::new(&settings, settings.host("production")?, &fixture);

    recipe.sync(Category::Themes)?;

    let calls = fixture.calls();
    assert_eq!(
        calls[0].paths(),
        (
            "/home/blah/bedrock/web/app/themes/",
            "/var/www/blah/wp-content/themes/"
        )
    );
    assert_eq!(
        calls[1].paths(),
        (
            "/var/www/blah/wp-content/themes/",
            "/home/blah/bedrock/web/app/themes/"
        )
    );

    Ok(())
}
