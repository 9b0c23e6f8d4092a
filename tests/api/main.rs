mod admission;
mod blacklist;
mod priority;
