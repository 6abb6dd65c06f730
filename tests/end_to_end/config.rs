//! Loading `procmap.toml` and applying it

use procmap::{Error, Mapper, MapperConfig, CONFIG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn mapper_built_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "include_return_value = false\nimplicit_cast = false\n").unwrap();

    let config = MapperConfig::load(&path).unwrap();
    let mapper = Mapper::new(config).unwrap();
    let options = mapper.read_options();
    assert!(!options.include_return_value);
    assert!(!options.implicit_cast);
    assert_eq!(mapper.config().parameter_prefix, '@');
}

#[test]
fn invalid_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "parameter_prefix = \"ab\"\n").unwrap();

    let err = MapperConfig::load(&path).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}

#[test]
fn default_template_is_valid() {
    let config = MapperConfig::from_toml_str(MapperConfig::default_toml()).unwrap();
    assert!(Mapper::new(config).is_ok());
}
