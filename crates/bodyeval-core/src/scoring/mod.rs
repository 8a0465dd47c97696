pub mod bleu;
pub mod overlap;
pub mod scorer;
pub mod tokenizer;
