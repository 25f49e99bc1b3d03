// Bitbucket Cloud pipelines integration
pub mod api_trait;
pub mod client;
pub mod types;

pub use api_trait::PipelineApi;
pub use client::BitbucketClient;
pub use types::{
    ListQuery, PipelineRequest, PipelineSelector, PipelineTarget, PipelineVariable, RepoRef,
};
