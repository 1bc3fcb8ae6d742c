mod engine;
mod scenarios;
