use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Initializes the logging system with a console appender.
///
/// Call once at application start; embedding applications that configure
/// `log` themselves can skip this entirely.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Info)
}

pub fn init_with_level(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;
    log4rs::init_config(config)?;
    log::info!("querylite initialized (features: {:?})", crate::features::COMPILED_FEATURES);
    Ok(())
}
