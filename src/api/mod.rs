mod client;
mod query;
mod view;

pub use client::{
    ApiRequest, ApiResponse, HttpTransport, LedgerClient, Method, NewAccount, NewBill, NewPayment,
    Page, Totals, Transport,
};
pub use query::{total_pages, ListQuery, SortDirection, SortField, SortSpec};
pub use view::{Applied, CollectionView, Ticket};
