//! End-to-end image definition generation for a project on disk

use codeup_core::config::ConfigLoader;
use codeup_core::dockerfile::{ImageDefinitionBuilder, Step, StepOutcome, CODE_SERVER_INSTALL, ENTRYPOINT};
use codeup_core::settings_sync::{GistSettingsSource, SettingsSyncConfig};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn demo_project() -> anyhow::Result<(TempDir, std::path::PathBuf)> {
    let temp = TempDir::new()?;
    let project = temp.path().join("proj");
    let dir = project.join(".devcontainer");
    fs::create_dir_all(&dir)?;
    fs::write(
        dir.join("devcontainer.json"),
        r#"{"name":"Demo","build":{"dockerfile":"Dockerfile"},"extensions":["ext.a"],"settings":{"editor.tabSize":2}}"#,
    )?;
    fs::write(dir.join("Dockerfile"), "FROM ubuntu")?;
    Ok((temp, project))
}

#[tokio::test]
async fn test_demo_definition_without_settings_sync() -> anyhow::Result<()> {
    let (_temp, project) = demo_project()?;
    let config = ConfigLoader::load_project(&project)?;
    let source = GistSettingsSource::new(SettingsSyncConfig::default())?;

    let definition = ImageDefinitionBuilder::new(&config, &source).build().await?;
    let lines: Vec<&str> = definition.content.lines().collect();

    assert_eq!(lines[0], "FROM ubuntu");
    assert_eq!(lines[1], CODE_SERVER_INSTALL);
    assert!(lines.contains(
        &"RUN code-server --install-extension ext.a --extensions-dir /opt/code-server/.vscode/extensions/"
    ));
    assert_eq!(lines.last().copied(), Some(ENTRYPOINT));
    assert!(!definition.content.contains("keybindings.json"));
    assert!(matches!(
        definition.outcome(Step::Keybindings),
        Some(StepOutcome::Skipped { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_demo_definition_with_settings_sync() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gists/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": {
                "settings.json": { "content": "{\"editor.tabSize\": 8, \"editor.wordWrap\": \"on\"}" },
                "keybindingsMac.json": { "content": "[{\"key\": \"cmd+b\", \"command\": \"toggle\"}]" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_temp, project) = demo_project()?;
    let config = ConfigLoader::load_project(&project)?;
    let source = GistSettingsSource::new(
        SettingsSyncConfig::new(Some("sync".into())).with_api_base_url(server.uri()),
    )?;

    let definition = ImageDefinitionBuilder::new(&config, &source).build().await?;
    assert_eq!(definition.outcome(Step::Settings), Some(&StepOutcome::Applied));
    assert_eq!(definition.outcome(Step::Keybindings), Some(&StepOutcome::Applied));

    let settings_pos = definition.content.find("/User/settings.json").expect("settings");
    let keys_pos = definition.content.find("/User/keybindings.json").expect("keybindings");
    let script_pos = definition.content.find("/opt/code-server/entrypoint.sh\nRUN chmod +x").expect("script");
    assert!(settings_pos < keys_pos && keys_pos < script_pos);
    Ok(())
}
