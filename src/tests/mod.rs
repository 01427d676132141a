mod invalid_json;
mod login;
mod notes;
mod pages;
