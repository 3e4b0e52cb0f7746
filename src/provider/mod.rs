pub mod facade;
pub mod hosted;
pub mod local;

#[cfg(feature = "embedded")]
pub mod embedded;

pub use facade::Facade;

/// Internal request type — every adapter accepts this.
pub struct GenRequest<'a> {
    pub system_prompt: &'a str,
    pub prompt: &'a str,
    pub max_new_tokens: u32,
}

/// Per-provider sampling parameters.
///
/// Each backend gets its own tuning: the hosted models behave with fairly
/// open sampling, while the small local/embedded models need lower
/// temperature and repetition penalties to stay coherent.
#[derive(Clone, Copy, Debug)]
pub struct Sampling {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: Option<u32>,
    pub repeat_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
}

impl Sampling {
    pub const fn hosted() -> Self {
        Self {
            temperature: 0.5,
            top_p: 0.9,
            top_k: None,
            repeat_penalty: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }

    pub const fn local() -> Self {
        Self {
            temperature: 0.25,
            top_p: 0.85,
            top_k: Some(40),
            repeat_penalty: Some(1.25),
            presence_penalty: Some(0.2),
            frequency_penalty: Some(0.2),
        }
    }

    pub const fn embedded() -> Self {
        Self {
            temperature: 0.35,
            top_p: 0.85,
            top_k: None,
            repeat_penalty: Some(1.25),
            presence_penalty: None,
            frequency_penalty: None,
        }
    }
}
