pub const FLU_MONTHS_DISPLAY_VERSION: &str = env!("FLU_MONTHS_DISPLAY_VERSION");
pub const FLU_MONTHS_BUILD_N: &str = env!("FLU_MONTHS_BUILD_N");

pub fn version_cli_text() -> String {
    format!(
        "flu-months {}\nBuild {}\nRolling-window sampling of dated influenza sequences",
        FLU_MONTHS_DISPLAY_VERSION, FLU_MONTHS_BUILD_N
    )
}
