use masgent_web::config::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_settings_and_operation_files() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join("config/operations"))?;

    let settings_toml = r#"
[server]
host = "0.0.0.0"
port = 8501

[sessions]
root_dir = "runs"
id_length = 12

[ui]
sidebar_file_limit = 5

[[operations]]
id = "generate_structure"
title = "Generate POSCAR from formula"
category = "Structure"

[operations.command]
program = "masgent-tool"
args = ["generate_vasp_poscar"]

[operations.input_schema]
type = "object"
required = ["formula"]

[operations.input_schema.properties.formula]
type = "string"
"#;
    fs::write(root.join("masgent-web.toml"), settings_toml)?;

    let supercell_json = r#"
{
    "id": "supercell",
    "title": "Generate supercell",
    "category": "Structure",
    "icon": "🧱",
    "input_schema": {
        "type": "object",
        "properties": {
            "poscar_path": {"type": "string"},
            "scaling_matrix": {"type": "string", "default": "2 0 0; 0 2 0; 0 0 2"}
        },
        "required": ["poscar_path"]
    },
    "command": {"program": "masgent-tool", "args": ["generate_supercell"]}
}
"#;
    fs::write(root.join("config/operations/10-supercell.json"), supercell_json)?;

    let kpoints_yaml = r#"
id: vasp_kpoints
title: Generate KPOINTS
category: VASP
input_schema:
  type: object
  properties:
    kpoints:
      type: array
      items: {type: integer}
      default: [4, 4, 4]
    gamma_centered:
      type: boolean
      default: true
command:
  program: masgent-tool
"#;
    fs::write(root.join("config/operations/20-kpoints.yaml"), kpoints_yaml)?;
    fs::write(root.join("config/operations/README.md"), "ignored")?;

    let settings = Settings::from_root(root)?;

    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 8501);
    assert_eq!(settings.sessions.root_dir, PathBuf::from("runs"));
    assert_eq!(settings.sessions.id_length, 12);
    assert_eq!(settings.ui.sidebar_file_limit, 5);

    let ids: Vec<&str> = settings.operations.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["generate_structure", "supercell", "vasp_kpoints"]);
    assert_eq!(settings.operations[0].command.args, vec!["generate_vasp_poscar".to_string()]);
    assert_eq!(settings.operations[1].icon.as_deref(), Some("🧱"));

    Ok(())
}

#[test]
fn test_defaults_without_settings_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let settings = Settings::from_root(temp_dir.path())?;

    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 3000);
    assert_eq!(settings.sessions.dir_env_var, "MASGENT_SESSION_RUNS_DIR");
    assert!(settings.operations.is_empty());
    assert!(settings.display.is_path_field("poscar_path"));
    Ok(())
}

#[test]
fn test_invalid_operation_fails_startup() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join("config/operations"))?;

    let broken = r#"
id: relax
title: ""
category: VASP
input_schema:
  type: object
  properties:
    mode:
      enum: []
command:
  program: ""
"#;
    fs::write(root.join("config/operations/relax.yaml"), broken)?;

    let err = Settings::from_root(root).unwrap_err().to_string();
    assert!(err.contains("Configuration validation failed"));
    assert!(err.contains("title"));
    assert!(err.contains("program"));
    Ok(())
}
