pub mod linked_accounts;
