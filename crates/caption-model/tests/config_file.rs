//! Loading caption configuration from disk.

use std::fs;

use captioneer_caption_model::{
    default_text_colors, CaptionConfig, Color, Coordinate, PositionSpec, TextAlign,
};

#[test]
fn messy_config_loads_with_per_field_fallbacks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("captions.toml");
    fs::write(
        &path,
        r##"
number_of_words = 0
font_size = 1000
stroke_width = -5
text_align = "justify"
highlight_color = "not-a-color"
position = ["50%", 0.9]
margin = [12, 24]
font_download = "yes"
"##,
    )
    .unwrap();

    let (config, warnings) = CaptionConfig::load(&path);

    assert_eq!(config.number_of_words, 1);
    assert_eq!(config.font_size, 500);
    assert_eq!(config.stroke_width, 0);
    assert_eq!(config.text_align, TextAlign::Center);
    assert_eq!(config.highlight_color, Color::WHITE);
    assert_eq!(config.text_colors, default_text_colors());
    assert_eq!(config.margin, [12, 24]);
    assert!(config.font_download);
    assert_eq!(
        config.position,
        PositionSpec::coordinates(Coordinate::Text("50%".into()), Coordinate::Number(0.9))
    );

    let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
    for expected in [
        "number_of_words",
        "font_size",
        "stroke_width",
        "text_align",
        "highlight_color",
        "font_download",
    ] {
        assert!(fields.contains(&expected), "missing warning for {expected}");
    }
}

#[test]
fn unparsable_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("captions.toml");
    fs::write(&path, "[[[ not toml").unwrap();

    let (config, warnings) = CaptionConfig::load(&path);
    assert_eq!(config, CaptionConfig::default());
    assert_eq!(warnings.len(), 1);
}
