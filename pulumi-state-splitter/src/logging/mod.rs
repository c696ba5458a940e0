mod headless;

use anyhow::Result;

pub(crate) struct Options {
    pub verbose: bool,
    pub color: bool,
}

pub(crate) trait Frontend {
    fn set_up(&self, options: &Options) -> Result<()>;
}

pub(crate) fn set_up(options: Options) -> Result<Box<dyn Frontend>> {
    let logger = headless::HeadlessLogger {};
    logger.set_up(&options)?;
    Ok(Box::new(logger))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_up() {
        let _logger = set_up(Options {
            verbose: true,
            color: false,
        })
        .unwrap();
        tracing::debug!("logging is set up");
        // There is only one global subscriber.
        assert!(set_up(Options {
            verbose: false,
            color: false,
        })
        .is_err());
    }
}
