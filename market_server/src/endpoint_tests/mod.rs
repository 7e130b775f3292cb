mod helpers;
mod mocks;
mod offers;
mod orders;
