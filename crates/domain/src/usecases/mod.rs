//! Application use cases / business logic

pub mod collect;
pub mod digest_cycle;
pub mod publish;
pub mod summarize;

#[cfg(test)]
mod fakes;

pub use collect::{CollectConfig, CollectUseCase};
pub use digest_cycle::{DigestConfig, DigestPipeline};
pub use publish::{PublishConfig, PublishUseCase, TREND_REPORT_SOURCE};
pub use summarize::{SummarizeConfig, SummarizeError, SummarizeUseCase};
