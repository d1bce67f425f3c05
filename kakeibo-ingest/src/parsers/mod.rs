pub mod moneyforward;
