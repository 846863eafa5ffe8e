//! # devx
//!
//! **A developer-assistance toolkit: AI commit messages, agent
//! environment generation, and a knowledge-base MCP server.**
//!
//! Three subsystems share one binary and one logging/config substrate:
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌─────────────┐
//! │   commit   │   │  agentenv   │   │     kwb     │
//! │ stage→LLM→ │   │ collectors→ │   │ walk→index→ │
//! │ pick→commit│   │ render tree │   │ search/MCP  │
//! └────────────┘   └─────────────┘   └─────────────┘
//! ```
//!
//! ## Subsystems
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`commit`] | stage changes, fan a prompt out to LLM providers, select a message interactively or automatically, transform it, commit / push / tag |
//! | [`agentenv`] | load a project YAML config, run context collectors, render per-provider instruction files and JSON sidecars |
//! | [`kwb`] | index a source tree into a full-text knowledge base and serve it over the Model Context Protocol |
//!
//! ## Quick Start
//!
//! ```bash
//! devx commit --auto --dry-run       # generate and show a commit message
//! devx agentenv init                 # scaffold .agentenv/
//! devx agentenv generate             # render provider files
//! devx kwb build                     # index the current tree
//! devx kwb search "http handler"     # query it
//! devx kwb serve                     # expose it over MCP stdio
//! ```
//!
//! Credentials come from the environment: `OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, and `GEMINI_API_KEY` each enable the matching
//! provider; `*_MODEL` variables override the default models.

pub mod agentenv;
pub mod commit;
pub mod kwb;
